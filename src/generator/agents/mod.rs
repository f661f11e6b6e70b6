// 三阶段 Multi-Agent 分析
// A = Researcher：围绕查询收集事实、数据、观点与趋势 = query
// B = Analyst：在调研材料之上做定量/定性分析、风险评估与建议 = query + A
// C = Orchestrator：汇总为六个固定章节的管理层报告 = query + A + B

pub mod analyst;
pub mod orchestrator;
pub mod researcher;

pub use analyst::Analyst;
pub use orchestrator::Orchestrator;
pub use researcher::Researcher;

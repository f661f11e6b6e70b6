//! 从最终报告中尽力提取执行摘要
//!
//! 模型输出是自由文本，这里只是启发式的投影而不是解析器：找不到时回落到报告开头的片段。

use regex::Regex;
use std::sync::LazyLock;

/// 回落时截取的字符数
pub const SUMMARY_FALLBACK_CHARS: usize = 350;

/// 摘要最多保留的行数
pub const SUMMARY_MAX_LINES: usize = 5;

static SUMMARY_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)executive\s+summary").expect("summary heading pattern is valid")
});

static NEXT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:#+\s*|\*+\s*|\d+[.)]\s*)*(?:key\s+findings|strategic\s+recommendations|implementation\s+roadmap|risk\s+considerations|conclusion)\b",
    )
    .expect("section heading pattern is valid")
});

/// 提取执行摘要
pub fn extract_executive_summary(report: &str) -> String {
    find_summary_section(report).unwrap_or_else(|| fallback_summary(report))
}

/// 定位包含 "EXECUTIVE SUMMARY" 的行，取其后的非空行直到下一个章节标题
pub fn find_summary_section(report: &str) -> Option<String> {
    let mut lines = report.lines();
    let mut collected: Vec<String> = Vec::new();

    let heading_line = lines.by_ref().find(|line| SUMMARY_HEADING.is_match(line))?;

    // 标题同一行后面可能直接跟着正文，例如 "EXECUTIVE SUMMARY: ..."
    if let Some(found) = SUMMARY_HEADING.find(heading_line) {
        let inline = clean_line(&heading_line[found.end()..]);
        if !inline.is_empty() {
            collected.push(inline);
        }
    }

    for line in lines {
        if collected.len() >= SUMMARY_MAX_LINES {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_section_heading(trimmed) {
            break;
        }
        let cleaned = clean_line(trimmed);
        if !cleaned.is_empty() {
            collected.push(cleaned);
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

/// 报告开头的片段，过长时追加省略号
pub fn fallback_summary(report: &str) -> String {
    let report = report.trim();
    if report.chars().count() > SUMMARY_FALLBACK_CHARS {
        let head: String = report.chars().take(SUMMARY_FALLBACK_CHARS).collect();
        format!("{}...", head)
    } else {
        report.to_string()
    }
}

fn is_section_heading(line: &str) -> bool {
    line.starts_with('#') || NEXT_SECTION.is_match(line)
}

/// 去掉markdown强调符号和标题后的冒号
fn clean_line(line: &str) -> String {
    line.trim()
        .trim_start_matches([':', '*', '#', '-'])
        .trim_end_matches('*')
        .trim()
        .to_string()
}

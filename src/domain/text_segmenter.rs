//! 句子切分
//!
//! 段落 → 句子，弱分隔符受最小字符数约束，短句在段内合并

/// 默认最小字符数
pub const DEFAULT_MIN_CHARS: usize = 20;

/// 切分配置
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// 弱分隔符触发切分所需的最小字符数，同时也是段内合并短句的阈值
    pub min_chars: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

#[inline]
fn is_strong_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '.' | '?' | '!')
}

#[inline]
fn is_weak_delimiter(ch: char) -> bool {
    matches!(ch, '，' | '；' | '：' | ',' | ';' | ':')
}

#[inline]
fn is_quote(ch: char) -> bool {
    matches!(ch, '"' | '\u{201C}' | '\u{201D}' | '\'' | '\u{2018}' | '\u{2019}' | '「' | '」')
}

#[inline]
fn is_closing_quote(ch: char) -> bool {
    matches!(ch, '"' | '\u{201D}' | '\u{2019}' | '」')
}

/// 只包含引号或空白的片段
#[inline]
fn is_trivial(s: &str) -> bool {
    s.chars().all(|c| is_quote(c) || c.is_whitespace())
}

/// 句子是否为引语（以引号开头）
pub fn is_quoted(sentence: &str) -> bool {
    sentence.chars().next().map(is_quote).unwrap_or(false)
}

/// 按分隔符切分（不合并）
///
/// 紧跟在强分隔符后的闭合引号归入当前句
fn split_by_delimiters(text: &str, config: &SplitConfig) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut char_count = 0;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        char_count += 1;

        let should_split = is_strong_delimiter(ch)
            || (is_weak_delimiter(ch) && char_count >= config.min_chars);

        if should_split {
            while let Some(&next) = chars.peek() {
                if is_closing_quote(next) || is_strong_delimiter(next) {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }

            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
            char_count = 0;
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// 合并短句直到满足 min_chars，余量并入前一句
fn merge_short(sentences: Vec<String>, min_chars: usize) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for sentence in sentences {
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(&sentence);

        if buffer.chars().count() >= min_chars {
            result.push(std::mem::take(&mut buffer));
        }
    }

    if !buffer.is_empty() {
        match result.last_mut() {
            Some(last) => {
                last.push(' ');
                last.push_str(&buffer);
            }
            None => result.push(buffer),
        }
    }

    result
}

/// 将一个段落切分为句子
pub fn split_paragraph(paragraph: &str, config: &SplitConfig) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();

    for sentence in merge_short(split_by_delimiters(paragraph, config), config.min_chars) {
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_trivial(trimmed) {
            if let Some(last) = sentences.last_mut() {
                last.push_str(trimmed);
            }
        } else {
            sentences.push(trimmed.to_string());
        }
    }

    sentences
}

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical quote pair every literal is rewritten to.
pub const OPEN_QUOTE: char = '「';
pub const CLOSE_QUOTE: char = '」';

const TRAILING_PUNCT: &[char] = &['。', '.', '!', '?', '．', '！', '？'];

/// Ending folds applied to unquoted text, in order.
static ENDING_FOLDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // interrogative and polite present progressive
        (r"て(?:いますか|いるでしょうか|いますよね|いますね|いるか)$", "ている"),
        // colloquial contraction
        (r"(され|見え|出|なっ|入っ|つい|い|し)てる(?:よね|ね|な|か)?", "${1}ている"),
        (r"ている(?:よね|ね|か)$", "ている"),
        (r"ていません(?:か|ね)?", "ていない"),
        // "〜ないか確認" asks; the assertion is the plain form
        (r"(ない|る)か(?:どうか)?を?(確認|チェック|検証)", "${1}ことを${2}"),
        (r"ていないか$", "ていない"),
        (r"ています", "ている"),
        (r"(撮|取)ってください$", "${1}る"),
        (r"待ってください$", "待つ"),
        (r"(?:してください|して下さい|をお願いします|お願いします|します)$", "する"),
        (r"^请", ""),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
        Ok(re) => Some((re, replacement)),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid ending fold");
            None
        }
    })
    .collect()
});

static ENGLISH_PREFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:please|kindly|can you|could you|would you)\s+").ok()
});

static ENGLISH_SUFFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i),?\s+please$").ok());

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Plain(String),
    Literal(String),
}

/// Normalize an instruction before rule matching.
///
/// Quoted literals are rewritten to `「…」` with their content untouched.
/// Outside literals, full-width ASCII is folded to half-width, whitespace is
/// collapsed, trailing sentence punctuation is dropped and colloquial or
/// polite endings are folded to their plain assertive form.
pub fn normalize(input: &str) -> String {
    let mut segments = split_literals(input);

    for seg in segments.iter_mut() {
        if let Segment::Plain(text) = seg {
            *text = collapse_whitespace(&fold_width(text));
        }
    }

    if let Some(Segment::Plain(text)) = segments.last_mut() {
        *text = text.trim_end().trim_end_matches(TRAILING_PUNCT).to_string();
    }

    if let Some(Segment::Plain(text)) = segments.first_mut() {
        *text = strip_english_courtesy(text.trim_start());
    }

    for seg in segments.iter_mut() {
        if let Segment::Plain(text) = seg {
            for (re, replacement) in ENDING_FOLDS.iter() {
                *text = re.replace_all(text, *replacement).into_owned();
            }
        }
    }

    let mut out = String::with_capacity(input.len());
    for seg in segments {
        match seg {
            Segment::Plain(text) => out.push_str(&text),
            Segment::Literal(text) => {
                out.push(OPEN_QUOTE);
                out.push_str(&text);
                out.push(CLOSE_QUOTE);
            }
        }
    }
    out.trim().to_string()
}

/// The closing quote for an opening quote character, if it is one.
fn closer_for(c: char) -> Option<char> {
    match c {
        '「' => Some('」'),
        '『' => Some('』'),
        '“' => Some('”'),
        '‘' => Some('’'),
        '"' => Some('"'),
        '＂' => Some('＂'),
        '\'' => Some('\''),
        _ => None,
    }
}

fn split_literals(input: &str) -> Vec<Segment> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let close = closer_for(c).and_then(|close| {
            // An apostrophe inside a word ("isn't") is not a quote
            if c == '\'' && i > 0 && chars[i - 1].is_alphanumeric() {
                return None;
            }
            find_closer(&chars, i + 1, c, close)
        });

        match close {
            Some(end) => {
                if !plain.is_empty() {
                    segments.push(Segment::Plain(std::mem::take(&mut plain)));
                }
                segments.push(Segment::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            None => {
                plain.push(c);
                i += 1;
            }
        }
    }

    if !plain.is_empty() {
        segments.push(Segment::Plain(plain));
    }
    segments
}

fn find_closer(chars: &[char], from: usize, open: char, close: char) -> Option<usize> {
    (from..chars.len()).find(|&j| {
        if chars[j] != close {
            return false;
        }
        if open == '\'' {
            // closing apostrophe must end a word
            return chars.get(j + 1).is_none_or(|next| !next.is_alphanumeric());
        }
        true
    })
}

fn fold_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn strip_english_courtesy(text: &str) -> String {
    let mut text = text.to_string();
    if let Some(re) = ENGLISH_PREFIX.as_ref() {
        // "could you please ..." carries two prefixes
        while let Some(m) = re.find(&text) {
            text = text[m.end()..].to_string();
        }
    }
    if let Some(re) = ENGLISH_SUFFIX.as_ref() {
        text = re.replace(&text, "").into_owned();
    }
    text
}

/// Literal contents in order of appearance.
pub fn literals(normalized: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = normalized;
    while let Some(start) = rest.find(OPEN_QUOTE) {
        let after = &rest[start + OPEN_QUOTE.len_utf8()..];
        match after.find(CLOSE_QUOTE) {
            Some(end) => {
                out.push(after[..end].to_string());
                rest = &after[end + CLOSE_QUOTE.len_utf8()..];
            }
            None => break,
        }
    }
    out
}

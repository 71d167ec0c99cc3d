//! JSONC 전처리 -- 주석과 trailing comma 제거
//!
//! `bun.lock`은 JSON에 주석과 trailing comma를 허용하는 JSONC 형식입니다.
//! 문자열 리터럴 안의 `//`, `/*`, `,`는 건드리지 않습니다.

/// `//` 줄 주석과 `/* */` 블록 주석을 제거합니다.
///
/// 줄 주석을 닫는 개행 문자는 유지됩니다.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            ('"' | '\'', _) => {
                in_string = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

/// `}` 또는 `]` 바로 앞(공백 무시)의 쉼표를 제거합니다.
pub fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (idx, &c) in chars.iter().enumerate() {
        if let Some(quote) = in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        if c == ',' {
            let closer = chars[idx + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(closer, Some('}' | ']')) {
                continue;
            }
        }
        if c == '"' || c == '\'' {
            in_string = Some(c);
        }
        out.push(c);
    }

    out
}

/// JSONC 텍스트를 `serde_json::Value`로 파싱합니다.
pub fn parse(input: &str) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(&strip_trailing_commas(&strip_comments(input)))
}

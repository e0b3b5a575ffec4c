// Rust guideline compliant 2026-07-20

//! Small SQL text helpers shared by the generator and the workload runner.

/// Split semicolon-separated statements, respecting quoted strings.
///
/// Handles single and double quotes with backslash escapes. Empty fragments
/// (trailing `;`, blank lines) are dropped; statements are trimmed.
#[must_use]
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == ';' {
                    let stmt = current.trim();
                    if !stmt.is_empty() {
                        statements.push(stmt.to_owned());
                    }
                    current.clear();
                } else {
                    if c == '\'' || c == '"' {
                        quote = Some(c);
                    }
                    current.push(c);
                }
            }
        }
    }
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_owned());
    }
    statements
}

/// Extract the table name of the first `CREATE TABLE` in `sql`, skipping an
/// optional `IF NOT EXISTS` and stripping backticks.
#[must_use]
pub fn table_from_create(sql: &str) -> Option<String> {
    let words: Vec<&str> = sql.split_whitespace().collect();
    let mut i = 0;
    while i + 1 < words.len() {
        if words[i].eq_ignore_ascii_case("create") && words[i + 1].eq_ignore_ascii_case("table") {
            let mut j = i + 2;
            if j + 2 < words.len()
                && words[j].eq_ignore_ascii_case("if")
                && words[j + 1].eq_ignore_ascii_case("not")
                && words[j + 2].eq_ignore_ascii_case("exists")
            {
                j += 3;
            }
            return words.get(j).map(|w| clean_identifier(w));
        }
        i += 1;
    }
    None
}

/// Extract the target table of a load template: the identifier after `INTO`
/// for write statements, else after `FROM`.
#[must_use]
pub fn table_from_template(template: &str) -> Option<String> {
    let words: Vec<&str> = template.split_whitespace().collect();
    for keyword in ["into", "from"] {
        if let Some(pos) = words.iter().position(|w| w.eq_ignore_ascii_case(keyword))
            && let Some(next) = words.get(pos + 1)
        {
            return Some(clean_identifier(next));
        }
    }
    None
}

/// Strip backticks and anything from the first `(` on (e.g. `t(id,name)`).
fn clean_identifier(word: &str) -> String {
    let word = word.split('(').next().unwrap_or(word);
    word.trim_matches('`').to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

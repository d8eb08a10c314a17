/// Collapses every whitespace run to one space, drops control characters, and trims.
/// Applied to all free text before it reaches a renderer, code included.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Sanitizes each entry and drops the ones left empty.
pub fn sanitize_list(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|e| sanitize_text(e))
        .filter(|e| !e.is_empty())
        .collect()
}

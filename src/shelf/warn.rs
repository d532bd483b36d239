fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

/// One per-item warning line on stderr.
#[derive(Debug, Clone, Copy)]
pub struct WarnEvent<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub item: &'a str,
    pub file_id: &'a str,
    pub retry: &'a str,
    pub reason: &'a str,
}

pub fn format_event(event: &WarnEvent<'_>) -> String {
    format!(
        "DOCSHELF_WARN code={} stage={} item={} file_id={} retry={} reason={}",
        sanitize_value(event.code),
        sanitize_value(event.stage),
        sanitize_value(event.item),
        sanitize_value(event.file_id),
        sanitize_value(event.retry),
        sanitize_value(event.reason),
    )
}

pub fn emit(event: &WarnEvent<'_>) {
    eprintln!("{}", format_event(event));
}

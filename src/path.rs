//! Slash-separated path joining with lexical cleanup.

/// Joins the non-empty `elements` with `/` and cleans the result.
///
/// Returns an empty string when every element is empty. The result never
/// carries a trailing slash unless it is the root.
pub(crate) fn join<S: AsRef<str>>(elements: &[S]) -> String {
    match elements.iter().position(|e| !e.as_ref().is_empty()) {
        Some(first) => {
            let joined = elements[first..]
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("/");
            clean(&joined)
        }
        None => String::new(),
    }
}

/// Returns the shortest path equivalent to `path` by purely lexical processing.
///
/// Repeated slashes collapse, `.` elements vanish, `..` removes the element
/// before it (or is dropped at the root), and trailing slashes are removed.
pub(crate) fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

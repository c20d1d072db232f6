use std::path::{Path, PathBuf};

/// Returns `base/desired`, or `base/desired-N` for the smallest `N >= 1`
/// that is not taken when the plain name already exists.
///
/// Nothing is created here. Callers create the returned path right away.
pub fn resolve(base: &Path, desired: &str) -> PathBuf {
    let candidate = base.join(desired);

    if !is_taken(&candidate) {
        log::trace!("Path is free: {:?}", candidate);
        return candidate;
    }

    let mut suffix: u64 = 1;

    loop {
        let candidate = base.join(format!("{}-{}", desired, suffix));

        if !is_taken(&candidate) {
            log::debug!("Resolved collision for {:?} to {:?}", base.join(desired), candidate);
            return candidate;
        }

        suffix += 1;
    }
}

// dangling symlinks count as taken
fn is_taken(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Appends an extension derived from `content_type` when `name` has no dot.
///
/// `image/jpeg` gives `jpeg`. A content type without a usable subtype
/// leaves the name as is.
pub fn with_inferred_extension(name: &str, content_type: &str) -> String {
    if name.contains('.') {
        return name.to_owned();
    }

    let subtype = match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed.subtype().as_str().to_owned(),
        Err(_) => content_type
            .split_once('/')
            .map(|(_, sub)| sub.trim().to_owned())
            .unwrap_or_default(),
    };

    if subtype.is_empty() || subtype == "*" {
        log::trace!("No extension derivable from content type {:?} for {:?}", content_type, name);
        return name.to_owned();
    }

    format!("{}.{}", name, subtype)
}

/// Turns a remote title into a single path component.
pub fn sanitize_component(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => String::from("untitled"),
        _ => cleaned,
    }
}

use std::sync::LazyLock;

use regex::Regex;

/// International phone numbers in E.164 form, e.g. `+992900000001`.
pub static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap());

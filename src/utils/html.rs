use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question statements and option texts go through this whitelist before
/// storage. Formatting tags like <b> survive; scripts and event handlers do not.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

//! UI language lookup.
//!
//! The wrapped document carries the user's UI language as a three-letter
//! ISO 639-2 code (`eng`, `deu`, ...). On Windows it is the user's UI
//! language as reported by `kernel32`. Elsewhere, or when that lookup fails,
//! it comes from `LC_ALL`, then `LC_MESSAGES`, then `LANG`.

const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

// ISO 639-1 -> ISO 639-2/T
const ISO_639: &[(&str, &str)] = &[
    ("ar", "ara"),
    ("bg", "bul"),
    ("ca", "cat"),
    ("cs", "ces"),
    ("da", "dan"),
    ("de", "deu"),
    ("el", "ell"),
    ("en", "eng"),
    ("es", "spa"),
    ("et", "est"),
    ("eu", "eus"),
    ("fa", "fas"),
    ("fi", "fin"),
    ("fr", "fra"),
    ("ga", "gle"),
    ("gl", "glg"),
    ("he", "heb"),
    ("hi", "hin"),
    ("hr", "hrv"),
    ("hu", "hun"),
    ("id", "ind"),
    ("is", "isl"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("lt", "lit"),
    ("lv", "lav"),
    ("ms", "msa"),
    ("nb", "nob"),
    ("nl", "nld"),
    ("nn", "nno"),
    ("no", "nor"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ro", "ron"),
    ("ru", "rus"),
    ("sk", "slk"),
    ("sl", "slv"),
    ("sr", "srp"),
    ("sv", "swe"),
    ("th", "tha"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("vi", "vie"),
    ("zh", "zho"),
];

/// Three-letter code of the process UI language, if one is set.
pub fn ui_language() -> Option<String> {
    platform_ui_language().or_else(|| language_from_vars(|var| std::env::var(var).ok()))
}

#[cfg(windows)]
mod kernel32 {
    #[link(name = "kernel32")]
    extern "system" {
        pub fn GetUserDefaultUILanguage() -> u16;
        pub fn GetLocaleInfoW(locale: u32, lc_type: u32, data: *mut u16, len: i32) -> i32;
    }
}

#[cfg(windows)]
const LOCALE_SISO639LANGNAME2: u32 = 0x67;

#[cfg(windows)]
fn platform_ui_language() -> Option<String> {
    let mut buf = [0u16; 9];
    // SAFETY: the length passed is the buffer's own length.
    let len = unsafe {
        // A LANGID with SORT_DEFAULT is its own LCID.
        let lcid = u32::from(kernel32::GetUserDefaultUILanguage());
        kernel32::GetLocaleInfoW(lcid, LOCALE_SISO639LANGNAME2, buf.as_mut_ptr(), buf.len() as i32)
    };
    if len <= 1 {
        log::debug!("GetLocaleInfoW returned no ISO 639-2 name");
        return None;
    }
    // `len` counts the trailing NUL
    let name = String::from_utf16_lossy(&buf[..len as usize - 1]);
    three_letter_code(&name)
}

#[cfg(not(windows))]
fn platform_ui_language() -> Option<String> {
    None
}

fn language_from_vars(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let value = LOCALE_VARS
        .iter()
        .filter_map(|var| lookup(*var))
        .find(|v| !v.trim().is_empty())?;
    let code = three_letter_code(&value);
    if code.is_none() {
        log::debug!("no ISO 639-2 code for locale '{}'", value);
    }
    code
}

/// Map a locale string (`de_DE.UTF-8`, `pt-BR`, `fr`, `eng`) to its
/// three-letter language code. `C` and `POSIX` have none.
pub fn three_letter_code(locale: &str) -> Option<String> {
    let lang = locale
        .trim()
        .split(['.', '@'])
        .next()?
        .split(['_', '-'])
        .next()?
        .to_ascii_lowercase();

    if lang == "c" || lang == "posix" || !lang.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    match lang.len() {
        2 => ISO_639
            .iter()
            .find(|(two, _)| *two == lang)
            .map(|(_, three)| (*three).to_string()),
        3 => Some(lang),
        _ => None,
    }
}

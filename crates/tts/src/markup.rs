//! SSML document construction

use std::borrow::Cow;

use crate::types::Prosody;

/// `xml:lang` used when the voice name carries no locale
const FALLBACK_LANG: &str = "en-US";

/// Wrap text in an SSML document for the given voice and prosody
///
/// `&`, `<` and `>` in the text are escaped. Voice and prosody values are
/// embedded verbatim; checking them is up to the provider. When `style` is
/// set the prosody element is wrapped in `mstts:express-as`.
pub fn build_markup(text: &str, voice: &str, prosody: &Prosody, style: Option<&str>) -> String {
    let lang = locale_of(voice).unwrap_or(FALLBACK_LANG);
    let text = escape_text(text);

    let body = format!(
        r#"<prosody rate="{rate}" pitch="{pitch}" volume="{volume}">{text}</prosody>"#,
        rate = prosody.rate,
        pitch = prosody.pitch,
        volume = prosody.volume,
    );

    let body = match style {
        Some(style) => format!(r#"<mstts:express-as style="{style}">{body}</mstts:express-as>"#),
        None => body,
    };

    format!(
        concat!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" "#,
            r#"xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="{lang}">"#,
            r#"<voice name="{voice}">{body}</voice></speak>"#,
        ),
        lang = lang,
        voice = voice,
        body = body,
    )
}

/// Escape the characters that would break the document structure
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}

/// Locale prefix of a neural voice name ("pt-BR-FranciscaNeural" → "pt-BR")
pub fn locale_of(voice: &str) -> Option<&str> {
    let mut parts = voice.splitn(3, '-');
    let (language, region, _name) = (parts.next()?, parts.next()?, parts.next()?);

    let valid = (2..=3).contains(&language.len())
        && language.chars().all(|c| c.is_ascii_lowercase())
        && !region.is_empty()
        && region.chars().all(|c| c.is_ascii_alphanumeric());

    valid.then(|| &voice[..language.len() + 1 + region.len()])
}

//! Wraps raw SVG markup in the HTML page the rendering surface loads.

use crate::Color;

/// Wrap the SVG markup in HTML with a compatibility directive that puts the
/// engine in its newest (Edge) mode, and a body with no padding or margin.
///
/// `lang` is emitted as `lang=XXX` only when it is non-blank. The SVG is
/// injected as-is: nothing is validated or escaped.
pub fn wrap_svg_in_html(svg: &str, background: Color, lang: Option<&str>) -> String {
    let lang_attr = match lang {
        Some(l) if !l.trim().is_empty() => format!(" lang={}", l),
        _ => String::new(),
    };

    format!(
        "<!DOCTYPE html>\n\
         <html{lang_attr}>\n\
         <head>\n  \
         <meta http-equiv='X-UA-Compatible' content='IE=Edge'>\n\
         </head>\n\
         <body style='padding:0px;margin:0px;background-color:{bg};' scroll='no'>{svg}\n\
         </body>\n\
         </html>",
        lang_attr = lang_attr,
        bg = background.to_html(),
        svg = svg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lang_is_omitted() {
        for lang in [None, Some(""), Some("   ")] {
            let html = wrap_svg_in_html("<svg/>", Color::WHITE, lang);
            assert!(!html.contains("lang"), "{}", html);
            assert!(html.contains("<html>"));
        }
    }

    #[test]
    fn lang_is_included_verbatim() {
        let html = wrap_svg_in_html("<svg/>", Color::WHITE, Some("eng"));
        assert!(html.contains("<html lang=eng>"));
        let html = wrap_svg_in_html("<svg/>", Color::WHITE, Some(" eng "));
        assert!(html.contains("<html lang= eng >"), "{}", html);
    }

    #[test]
    fn body_carries_background_and_markup() {
        let html = wrap_svg_in_html("<svg><rect/></svg>", Color::rgb(0x12, 0xAB, 0x00), None);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("content='IE=Edge'"));
        assert!(html.contains("background-color:#12AB00;"));
        assert!(html.contains("scroll='no'><svg><rect/></svg>"));
    }

    #[test]
    fn markup_is_not_escaped() {
        let hostile = "<svg><script>alert('x')</script></svg>";
        assert!(wrap_svg_in_html(hostile, Color::WHITE, None).contains(hostile));
    }
}

//! Style roles expressed as an enum + macro mapping logical names to `colored::Color`.
//!
//! Coloring is applied only when the `enabled` flag passed to `paint()` is
//! true, so there is no global color state.
//!
//! ```
//! use distscan::core::styles::StyleRole;
//! let plain = StyleRole::Header.paint("Title", false);
//! assert_eq!(plain, "Title");
//! let colored = StyleRole::Header.paint("Title", true);
//! assert!(colored.starts_with("\x1b["));
//! assert!(colored.ends_with("\x1b[0m"));
//! ```

use clap::builder::styling::AnsiColor;
use colored::Color;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }

            pub fn ansi_code(self) -> Option<String> {
                map_color_code(self.color()?)
            }

            pub fn paint(self, text: &str, enabled: bool) -> String {
                if !enabled { return text.to_string(); }
                if let Some(code) = self.ansi_code() { return format!("\x1b[{}m{}\x1b[0m", code, text); }
                text.to_string()
            }

            /// prettytable `style_spec` foreground for this role
            pub fn to_prettytable_spec(self) -> Option<String> {
                let spec_char = match self.color()? {
                    Color::Red => "r",
                    Color::Green => "g",
                    Color::Yellow => "y",
                    Color::Blue => "b",
                    Color::Cyan => "c",
                    Color::BrightBlack => "K",
                    Color::BrightRed => "R",
                    Color::BrightGreen => "G",
                    Color::BrightYellow => "Y",
                    _ => return None,
                };
                Some(format!("F{}", spec_char))
            }
        }
    }
}

// Value => None (uncoloured)
style! {
    Header  => Some(Color::Yellow),
    Literal => Some(Color::Cyan),
    Key     => Some(Color::BrightGreen),
    Value   => None,
    Clean   => Some(Color::Green),
    Flagged => Some(Color::BrightRed),
    Error   => Some(Color::BrightRed),
    Dim     => Some(Color::BrightBlack)
}

fn map_color_code(c: Color) -> Option<String> {
    use Color::*;
    match c {
        Black => Some("30".to_string()),
        Red => Some("31".to_string()),
        Green => Some("32".to_string()),
        Yellow => Some("33".to_string()),
        Blue => Some("34".to_string()),
        Magenta => Some("35".to_string()),
        Cyan => Some("36".to_string()),
        White => Some("37".to_string()),
        BrightBlack => Some("90".to_string()),
        BrightRed => Some("91".to_string()),
        BrightGreen => Some("92".to_string()),
        BrightYellow => Some("93".to_string()),
        BrightBlue => Some("94".to_string()),
        BrightMagenta => Some("95".to_string()),
        BrightCyan => Some("96".to_string()),
        BrightWhite => Some("97".to_string()),
        TrueColor { r, g, b } => Some(format!("38;2;{};{};{}", r, g, b)),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn color_to_ansi(c: Color) -> Option<AnsiColor> {
    use self::AnsiColor as A;
    use Color::*;
    Some(match c {
        Red => A::Red,
        Green => A::Green,
        Yellow => A::Yellow,
        Blue => A::Blue,
        Cyan => A::Cyan,
        BrightBlack => A::BrightBlack,
        BrightRed => A::BrightRed,
        BrightGreen => A::BrightGreen,
        _ => return None,
    })
}

/// clap help styles built from the same roles
pub fn palette_to_clap(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new();
        if let Some(col) = role.color().and_then(color_to_ansi) {
            s = s.fg_color(Some(ClapColor::Ansi(col)));
        }
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Literal, false))
        .placeholder(style(StyleRole::Key, false))
        .valid(style(StyleRole::Clean, false))
        .invalid(style(StyleRole::Flagged, false))
        .error(style(StyleRole::Error, false))
}

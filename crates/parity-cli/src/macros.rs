/// Paints text when stdout is a terminal, plain text otherwise.
macro_rules! colorize_impl {
    ($color_expr:expr, $($arg:tt)*) => {
        {
            use atty::Stream;
            if atty::is(Stream::Stdout) {
                format!("{}", $color_expr.paint(format!($($arg)*)))
            } else {
                format!($($arg)*)
            }
        }
    }
}

macro_rules! green {
    ($($arg:tt)*) => {
        colorize_impl!(ansi_term::Colour::Green.bold(), $($arg)*)
    }
}

macro_rules! red {
    ($($arg:tt)*) => {
        colorize_impl!(ansi_term::Colour::Red.bold(), $($arg)*)
    }
}

macro_rules! yellow {
    ($($arg:tt)*) => {
        colorize_impl!(ansi_term::Colour::Yellow.bold(), $($arg)*)
    }
}

macro_rules! blue {
    ($($arg:tt)*) => {
        colorize_impl!(ansi_term::Colour::Cyan.bold(), $($arg)*)
    }
}

macro_rules! black {
    ($($arg:tt)*) => {
        colorize_impl!(ansi_term::Colour::Fixed(244), $($arg)*)
    }
}

macro_rules! pluralize {
    ($value:expr, $word:expr) => {
        if $value == 1 {
            format!("{} {}", $value, $word)
        } else {
            format!("{} {}s", $value, $word)
        }
    };
}

macro_rules! format_err {
    ($($arg:tt)*) => {
        format!("{} {}", red!("error:"), format!($($arg)*))
    }
}

macro_rules! format_warn {
    ($($arg:tt)*) => {
        format!("{} {}", yellow!("warning:"), format!($($arg)*))
    }
}

#[cfg(test)]
mod tests {
    fn is_tty() -> bool {
        atty::is(atty::Stream::Stdout)
    }

    #[test]
    fn test_color_macros_contain_text() {
        assert!(green!("equivalent").contains("equivalent"));
        assert!(red!("differ").contains("differ"));
        assert!(yellow!("warning").contains("warning"));
        assert!(blue!("note").contains("note"));
        assert!(black!("a ↔ b").contains("a ↔ b"));
    }

    #[test]
    fn test_plain_output_off_terminal() {
        let painted = green!("{} resources", 3);
        if is_tty() {
            assert!(painted.contains("\x1b["));
        } else {
            assert_eq!(painted, "3 resources");
        }
        assert_eq!(painted.contains("\x1b["), red!("x").contains("\x1b["));
    }

    #[test]
    fn test_format_macros() {
        let err = format_err!("{} is unreadable", "main.tf");
        assert!(err.contains("error:"));
        assert!(err.contains("main.tf is unreadable"));

        let warn = format_warn!("unknown attribute");
        assert!(warn.contains("warning:"));
        assert!(warn.contains("unknown attribute"));
    }

    #[test]
    fn test_pluralize_macro() {
        assert_eq!(pluralize!(1, "resource"), "1 resource");
        assert_eq!(pluralize!(0, "resource"), "0 resources");
        assert_eq!(pluralize!(4, "difference"), "4 differences");
    }
}

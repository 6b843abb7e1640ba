use ratatui::style::Color;

pub const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

pub const ASSISTANT_NAME: &str = "Sona";
pub const USER_NAME: &str = "You";

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const TOAST_SECS: u64 = 4;
pub const DEFAULT_EXPORT_PATH: &str = "sona-transcript.html";

/// Fence tags that get a label (and, for json, highlighting).
pub const CODE_LANGUAGES: [&str; 6] = ["json", "javascript", "python", "html", "css", "sql"];

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub bg_alt: Color,
    pub border: Color,
    pub text: Color,
    pub text_muted: Color,
    pub text_dim: Color,
    pub accent: Color,
    pub heading: Color,
    pub strong: Color,
    pub emphasis: Color,
    pub code: Color,
    pub json_key: Color,
    pub json_string: Color,
    pub json_number: Color,
    pub json_literal: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

pub const DARK_PALETTE: Palette = Palette {
    bg: Color::Rgb(10, 14, 20),
    bg_alt: Color::Rgb(15, 22, 36),
    border: Color::Rgb(27, 35, 51),
    text: Color::Rgb(224, 224, 224),
    text_muted: Color::Rgb(159, 179, 209),
    text_dim: Color::Rgb(111, 122, 143),
    accent: Color::Rgb(236, 112, 160),
    heading: Color::Rgb(157, 124, 216),
    strong: Color::Rgb(245, 167, 66),
    emphasis: Color::Rgb(229, 192, 123),
    code: Color::Rgb(127, 216, 143),
    json_key: Color::Rgb(86, 182, 194),
    json_string: Color::Rgb(127, 216, 143),
    json_number: Color::Rgb(245, 167, 66),
    json_literal: Color::Rgb(157, 124, 216),
    success: Color::Rgb(16, 185, 129),
    warning: Color::Rgb(245, 158, 11),
    error: Color::Rgb(248, 113, 113),
};

pub const LIGHT_PALETTE: Palette = Palette {
    bg: Color::Rgb(250, 247, 245),
    bg_alt: Color::Rgb(255, 255, 255),
    border: Color::Rgb(226, 214, 220),
    text: Color::Rgb(38, 38, 48),
    text_muted: Color::Rgb(88, 96, 112),
    text_dim: Color::Rgb(140, 146, 160),
    accent: Color::Rgb(196, 62, 118),
    heading: Color::Rgb(109, 64, 184),
    strong: Color::Rgb(170, 90, 10),
    emphasis: Color::Rgb(120, 84, 30),
    code: Color::Rgb(22, 120, 60),
    json_key: Color::Rgb(20, 110, 140),
    json_string: Color::Rgb(22, 120, 60),
    json_number: Color::Rgb(170, 90, 10),
    json_literal: Color::Rgb(109, 64, 184),
    success: Color::Rgb(5, 130, 90),
    warning: Color::Rgb(180, 110, 0),
    error: Color::Rgb(200, 40, 40),
};

pub const SONA_LOGO: [&str; 6] = [
    " ███████╗ ██████╗ ███╗   ██╗ █████╗ ",
    " ██╔════╝██╔═══██╗████╗  ██║██╔══██╗",
    " ███████╗██║   ██║██╔██╗ ██║███████║",
    " ╚════██║██║   ██║██║╚██╗██║██╔══██║",
    " ███████║╚██████╔╝██║ ╚████║██║  ██║",
    " ╚══════╝ ╚═════╝ ╚═╝  ╚═══╝╚═╝  ╚═╝",
];

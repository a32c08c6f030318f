//! Colours shared by all views.

use ratatui::style::Color;

pub fn black() -> Color {
    Color::Black
}

pub fn white() -> Color {
    Color::White
}

pub fn gray() -> Color {
    Color::Gray
}

pub fn dark_gray() -> Color {
    Color::DarkGray
}

pub fn red() -> Color {
    Color::Red
}

pub fn light_red() -> Color {
    Color::LightRed
}

pub fn green() -> Color {
    Color::Green
}

pub fn yellow() -> Color {
    Color::Yellow
}

pub fn blue() -> Color {
    Color::Blue
}

pub fn cyan() -> Color {
    Color::Cyan
}

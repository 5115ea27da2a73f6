//! Line protocol for driving the pad without a touchscreen.
//!
//! ```text
//! down 120 40     # pointer down at (120, 40)
//! move 140 200
//! up              # gesture complete, triggers classification
//! clear
//! quit
//! ```

use crate::canvas::Point;
use crate::error::{Result, ScrawlError};
use crate::pad::{PadEvent, PointerInput};

/// Parse one line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str) -> Result<Option<PadEvent>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    let event = match (command.as_str(), args.as_slice()) {
        ("down" | "d", [x, y]) => PadEvent::Pointer(PointerInput::Down(point(x, y)?)),
        ("move" | "m", [x, y]) => PadEvent::Pointer(PointerInput::Move(point(x, y)?)),
        ("up" | "u", []) => PadEvent::Pointer(PointerInput::Up),
        ("clear" | "c", []) => PadEvent::Clear,
        ("quit" | "q" | "exit", []) => PadEvent::Shutdown,
        ("down" | "d" | "move" | "m", _) => {
            return Err(ScrawlError::Other(format!(
                "'{command}' takes two coordinates, e.g. '{command} 10 20'"
            )))
        }
        _ => {
            return Err(ScrawlError::Other(format!(
                "Unknown command: '{line}'. Expected down/move/up/clear/quit"
            )))
        }
    };

    Ok(Some(event))
}

fn point(x: &str, y: &str) -> Result<Point> {
    let parse = |v: &str| {
        v.parse::<f32>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ScrawlError::Other(format!("Invalid coordinate: '{v}'")))
    };
    Ok(Point::new(parse(x)?, parse(y)?))
}

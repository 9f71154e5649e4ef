use crate::{
    board::Query,
    note::{Location, Note},
    store::BoardHandle,
};

const REFERS_TO: &str = "refersTo=";
const COLOUR: &str = "colour=";
const CONTAINS: &str = "contains=";

/// A malformed command. Never reaches the board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Blank line.
    #[error("Empty command")]
    Empty,
    /// First word is not a known command. Holds the upper-cased word.
    #[error("Unknown command {0}")]
    UnknownCommand(String),
    /// `POST` with fewer than four fields.
    #[error("Invalid Format: <x> <y> <colour> <message>")]
    PostFormat,
    /// `PIN` or `UNPIN` without exactly two fields.
    #[error("Invalid Format: <x> <y>")]
    PinFormat,
    /// A coordinate that is not an integer.
    #[error("Invalid coordinates (MUST BE INT)!")]
    Coordinates,
    /// `contains=` without a comma.
    #[error("Invalid contains format, expected contains=<x>,<y>")]
    ContainsFormat,
    /// `contains=` with a non-integer coordinate.
    #[error("Invalid contains coordinates (MUST BE INT)!")]
    ContainsCoordinates,
    /// A line longer than the session accepts.
    #[error("Line too long")]
    LineTooLong,
}

impl ProtocolError {
    /// Wire rendering.
    pub fn response(&self) -> String {
        format!("ERROR {self}")
    }
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `POST <x> <y> <colour> <message...>`
    Post {
        /// Top-left corner.
        origin: Location,
        /// Colour as typed.
        colour: String,
        /// Everything after the colour.
        message: String,
    },
    /// `GET [colour=<c>] [contains=<x>,<y>] [refersTo=<text>]`
    Get(Query),
    /// `GET PINS`
    Pins,
    /// `PIN <x> <y>`
    Pin(Location),
    /// `UNPIN <x> <y>`
    Unpin(Location),
    /// `SHAKE`
    Shake,
    /// `CLEAR`
    Clear,
    /// `DISCONNECT`
    Disconnect,
}

impl std::str::FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let (word, args) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));

        match word.to_uppercase().as_str() {
            "POST" => parse_post(args),
            "GET" => parse_get(args),
            "PIN" => parse_location(args).map(Command::Pin),
            "UNPIN" => parse_location(args).map(Command::Unpin),
            "SHAKE" => Ok(Command::Shake),
            "CLEAR" => Ok(Command::Clear),
            "DISCONNECT" => Ok(Command::Disconnect),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Split `text` into at most `n` whitespace-separated fields, the last one keeping the remainder verbatim.
fn split_fields(text: &str, n: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = text.trim();
    while fields.len() + 1 < n {
        match rest.split_once(char::is_whitespace) {
            Some((field, tail)) => {
                fields.push(field);
                rest = tail.trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}

fn parse_post(args: &str) -> Result<Command, ProtocolError> {
    match split_fields(args, 4)[..] {
        [x, y, colour, message] => Ok(Command::Post {
            origin: parse_coordinates(x, y)?,
            colour: colour.to_string(),
            message: message.to_string(),
        }),
        _ => Err(ProtocolError::PostFormat),
    }
}

fn parse_location(args: &str) -> Result<Location, ProtocolError> {
    match args.split_whitespace().collect::<Vec<_>>()[..] {
        [x, y] => parse_coordinates(x, y),
        _ => Err(ProtocolError::PinFormat),
    }
}

fn parse_coordinates(x: &str, y: &str) -> Result<Location, ProtocolError> {
    let x = x.parse().map_err(|_| ProtocolError::Coordinates)?;
    let y = y.parse().map_err(|_| ProtocolError::Coordinates)?;
    Ok(Location::new(x, y))
}

/// Byte offset of the first `refersTo=` that starts a whitespace-delimited token.
fn find_refers_to(args: &str) -> Option<usize> {
    args.match_indices(REFERS_TO)
        .map(|(index, _)| index)
        .find(|&index| {
            args[..index]
                .chars()
                .next_back()
                .map_or(true, char::is_whitespace)
        })
}

fn parse_contains(point: &str) -> Result<Location, ProtocolError> {
    let (x, y) = point
        .split_once(',')
        .ok_or(ProtocolError::ContainsFormat)?;
    let x = x.parse().map_err(|_| ProtocolError::ContainsCoordinates)?;
    let y = y.parse().map_err(|_| ProtocolError::ContainsCoordinates)?;
    Ok(Location::new(x, y))
}

fn parse_get(args: &str) -> Result<Command, ProtocolError> {
    let args = args.trim();
    if args.eq_ignore_ascii_case("PINS") {
        return Ok(Command::Pins);
    }

    let mut query = Query::default();

    // refersTo= swallows the rest of the line, so it is cut off before anything else is parsed.
    let clauses = match find_refers_to(args) {
        Some(index) => {
            query.refers_to = Some(args[index + REFERS_TO.len()..].to_string());
            &args[..index]
        }
        None => args,
    };

    // The first occurrence of a filter wins, anything that is not a filter is skipped.
    for clause in clauses.split_whitespace() {
        if let Some(colour) = clause.strip_prefix(COLOUR) {
            if query.colour.is_none() && !colour.is_empty() {
                query.colour = Some(colour.to_string());
            }
        } else if let Some(point) = clause.strip_prefix(CONTAINS) {
            if query.contains.is_none() {
                query.contains = Some(parse_contains(point)?);
            }
        }
    }
    Ok(Command::Get(query))
}

/// The three preamble lines sent before any command is read.
pub fn welcome(board: &BoardHandle) -> String {
    format!(
        "BOARD {}\nNOTE {}\nCOLOURS {}\n",
        board.size(),
        board.note_size(),
        board.colours().join(" ")
    )
}

/// `COMPLETE! <n>` followed by one `x y w h colour message` line per note.
pub fn render_notes(notes: &[Note]) -> String {
    let mut response = format!("COMPLETE! {}", notes.len());
    for note in notes {
        response.push_str(&format!(
            "\n{} {} {} {}",
            note.origin(),
            note.size(),
            note.colour(),
            note.message()
        ));
    }
    response
}

/// `COMPLETE! <n>` followed by one `x y` line per pin.
pub fn render_pins(pins: &[Location]) -> String {
    let mut response = format!("COMPLETE! {}", pins.len());
    for pin in pins {
        response.push_str(&format!("\n{pin}"));
    }
    response
}

use std::fmt;

use crate::note::{Dimensions, Location, Note};

/// Category of a board rule violation, rendered as its wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The note would not fit on the board.
    OutOfRange,
    /// The colour is not in the board's palette.
    ColourNotSupported,
    /// Another note already sits at exactly that position.
    Overlap,
    /// No note could be pinned or unpinned at that point.
    NoteNotFound,
}

impl ErrorKind {
    /// Wire code, e.g. `OUT_OF_RANGE`.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::OutOfRange => "OUT_OF_RANGE",
            ErrorKind::ColourNotSupported => "COLOUR_NOT_SUPPORTED",
            ErrorKind::Overlap => "OVERLAP",
            ErrorKind::NoteNotFound => "NOTE_NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A board rule violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct BoardError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human readable detail.
    pub message: String,
}

impl BoardError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wire rendering. The kind code is sent twice, in the code and in the message slot,
    /// which is what existing clients expect.
    pub fn response(&self) -> String {
        format!("ERROR {0} {0}", self.kind)
    }
}

/// Conjunctive filter for [`Board::get`]. An absent field matches every note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Colour, compared case-insensitively.
    pub colour: Option<String>,
    /// A point the note's rectangle must contain.
    pub contains: Option<Location>,
    /// Text the message must contain, case-sensitive.
    pub refers_to: Option<String>,
}

impl Query {
    /// Whether `note` passes every present filter.
    pub fn matches(&self, note: &Note) -> bool {
        self.colour
            .as_deref()
            .map_or(true, |colour| note.colour() == colour.to_lowercase())
            && self.contains.map_or(true, |point| note.has_point(point))
            && self
                .refers_to
                .as_deref()
                .map_or(true, |text| note.message().contains(text))
    }
}

/// The bulletin board: fixed geometry, a colour palette and the notes in arrival order.
///
/// `Board` itself is not synchronised. It is owned by a single task which serialises
/// access, see [`crate::store`].
#[derive(Debug)]
pub struct Board {
    size: Dimensions,
    note_size: Dimensions,
    colours: Vec<String>,
    notes: Vec<Note>,
}

impl Board {
    /// Create an empty board. Colours are lower-cased and de-duplicated, keeping first occurrence order.
    pub fn new<I, S>(size: Dimensions, note_size: Dimensions, colours: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut palette: Vec<String> = Vec::new();
        for colour in colours {
            let colour = colour.as_ref().to_lowercase();
            if !palette.contains(&colour) {
                palette.push(colour);
            }
        }
        Self {
            size,
            note_size,
            colours: palette,
            notes: Vec::new(),
        }
    }

    /// Board extent.
    pub fn size(&self) -> Dimensions {
        self.size
    }

    /// Size given to every posted note.
    pub fn note_size(&self) -> Dimensions {
        self.note_size
    }

    /// Valid, lower-cased colours.
    pub fn colours(&self) -> &[String] {
        &self.colours
    }

    /// Number of notes on the board.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether the board holds no notes.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Post a note at `origin`.
    ///
    /// Checks run in this order: bounds, colour, overlap. The first failing one is reported.
    pub fn post(&mut self, origin: Location, colour: &str, message: &str) -> Result<(), BoardError> {
        let note = Note::new(
            origin,
            self.note_size,
            colour.to_lowercase(),
            message.to_string(),
        );

        if !note.in_bounds(self.size) {
            return Err(BoardError::new(ErrorKind::OutOfRange, "out of board range"));
        }
        if !self.colours.iter().any(|valid| valid == note.colour()) {
            return Err(BoardError::new(
                ErrorKind::ColourNotSupported,
                format!("choose one of: {}", self.colours.join(", ")),
            ));
        }
        if self.notes.iter().any(|existing| note.overlaps(existing)) {
            return Err(BoardError::new(
                ErrorKind::Overlap,
                "note overlaps with an existing note",
            ));
        }
        self.notes.push(note);
        Ok(())
    }

    /// Notes matching `query`, in arrival order.
    pub fn get(&self, query: &Query) -> Vec<Note> {
        self.notes
            .iter()
            .filter(|note| query.matches(note))
            .cloned()
            .collect()
    }

    /// Pin every note containing `at`. Returns how many notes were hit,
    /// counting notes that already had a pin there.
    pub fn pin(&mut self, at: Location) -> Result<usize, BoardError> {
        let mut pinned = 0;
        for note in self.notes.iter_mut().filter(|note| note.has_point(at)) {
            note.add_pin(at);
            pinned += 1;
        }
        if pinned == 0 {
            return Err(no_note_at(at));
        }
        Ok(pinned)
    }

    /// Remove the pin at `at` from every note that has one. Returns how many pins were removed.
    pub fn unpin(&mut self, at: Location) -> Result<usize, BoardError> {
        let unpinned = self
            .notes
            .iter_mut()
            .map(|note| note.remove_pin(at))
            .filter(|removed| *removed)
            .count();
        if unpinned == 0 {
            return Err(no_note_at(at));
        }
        Ok(unpinned)
    }

    /// Remove every unpinned note. Returns how many were removed.
    pub fn shake(&mut self) -> usize {
        let before = self.notes.len();
        self.notes.retain(Note::is_pinned);
        before - self.notes.len()
    }

    /// Remove every note. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.notes.len();
        self.notes.clear();
        removed
    }

    /// Every pin of every note, in note arrival order. A point pinned on two notes appears twice.
    pub fn pins(&self) -> Vec<Location> {
        self.notes.iter().flat_map(|note| note.pins()).collect()
    }
}

fn no_note_at(at: Location) -> BoardError {
    BoardError::new(ErrorKind::NoteNotFound, format!("no note at {at}"))
}

#[cfg(test)]
mod test {
    use super::*;

    fn board() -> Board {
        Board::new(Dimensions::new(10, 10), Dimensions::new(2, 2), ["Red", "blue", "RED"])
    }

    fn kind(result: Result<impl fmt::Debug, BoardError>) -> ErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn palette_is_normalised() {
        assert_eq!(board().colours(), ["red", "blue"]);
    }

    #[test]
    fn posted_note_is_returned() {
        let mut board = board();
        board.post(Location::new(3, 4), "red", "hello").unwrap();

        let notes = board.get(&Query::default());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].origin(), Location::new(3, 4));
        assert_eq!(notes[0].size(), Dimensions::new(2, 2));
        assert_eq!(notes[0].colour(), "red");
        assert_eq!(notes[0].message(), "hello");
    }

    #[test]
    fn notes_take_configured_width_and_height() {
        let mut board = Board::new(Dimensions::new(10, 10), Dimensions::new(4, 1), ["red"]);
        board.post(Location::new(6, 9), "red", "wide").unwrap();
        assert_eq!(board.get(&Query::default())[0].size(), Dimensions::new(4, 1));
        assert_eq!(
            kind(board.post(Location::new(7, 0), "red", "too wide")),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn same_position_overlaps_regardless_of_content() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "hello").unwrap();
        assert_eq!(
            kind(board.post(Location::new(0, 0), "blue", "world")),
            ErrorKind::Overlap
        );
        board.post(Location::new(1, 1), "blue", "offset").unwrap();
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn out_of_range_is_checked_first() {
        let mut board = board();
        board.post(Location::new(8, 8), "red", "corner").unwrap();
        assert_eq!(
            kind(board.post(Location::new(9, 0), "red", "x")),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            kind(board.post(Location::new(0, -1), "red", "x")),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            kind(board.post(Location::new(9, 9), "green", "x")),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn colour_is_checked_before_overlap() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "hello").unwrap();
        let error = board.post(Location::new(0, 0), "green", "x").unwrap_err();
        assert_eq!(error.kind, ErrorKind::ColourNotSupported);
        assert!(error.message.contains("red, blue"));
    }

    #[test]
    fn colour_is_case_insensitive() {
        let mut board = board();
        board.post(Location::new(0, 0), "RED", "a").unwrap();
        board.post(Location::new(2, 0), "red", "b").unwrap();
        let notes = board.get(&Query {
            colour: Some("Red".to_string()),
            ..Query::default()
        });
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|note| note.colour() == "red"));
    }

    #[test]
    fn filters_are_conjunctive_and_ordered() {
        let mut board = board();
        board.post(Location::new(4, 4), "blue", "meeting at noon").unwrap();
        board.post(Location::new(0, 0), "red", "lunch").unwrap();
        board.post(Location::new(3, 3), "red", "meeting moved").unwrap();

        let meetings = board.get(&Query {
            refers_to: Some("meeting".to_string()),
            ..Query::default()
        });
        assert_eq!(
            meetings.iter().map(Note::message).collect::<Vec<_>>(),
            ["meeting at noon", "meeting moved"]
        );

        let query = Query {
            colour: Some("red".to_string()),
            contains: Some(Location::new(4, 4)),
            refers_to: Some("meeting".to_string()),
        };
        let notes = board.get(&query);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message(), "meeting moved");

        let case_sensitive = Query {
            refers_to: Some("Meeting".to_string()),
            ..Query::default()
        };
        assert!(board.get(&case_sensitive).is_empty());
    }

    #[test]
    fn pin_hits_every_containing_note() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "a").unwrap();
        board.post(Location::new(1, 1), "red", "b").unwrap();
        board.post(Location::new(5, 5), "red", "c").unwrap();

        assert_eq!(board.pin(Location::new(1, 1)), Ok(2));
        assert_eq!(board.pin(Location::new(1, 1)), Ok(2));
        assert_eq!(board.pin(Location::new(0, 0)), Ok(1));
        assert_eq!(kind(board.pin(Location::new(9, 0))), ErrorKind::NoteNotFound);

        assert_eq!(
            board.pins(),
            vec![Location::new(0, 0), Location::new(1, 1), Location::new(1, 1)]
        );
    }

    #[test]
    fn unpin_requires_an_existing_pin() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "a").unwrap();
        assert_eq!(kind(board.unpin(Location::new(1, 1))), ErrorKind::NoteNotFound);

        board.pin(Location::new(1, 1)).unwrap();
        assert_eq!(board.unpin(Location::new(1, 1)), Ok(1));
        assert_eq!(kind(board.unpin(Location::new(1, 1))), ErrorKind::NoteNotFound);
    }

    #[test]
    fn shake_removes_only_unpinned_notes() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "pinned").unwrap();
        board.post(Location::new(4, 4), "blue", "loose").unwrap();
        board.post(Location::new(6, 6), "blue", "loose too").unwrap();
        board.pin(Location::new(1, 0)).unwrap();

        assert_eq!(board.shake(), 2);
        assert_eq!(board.shake(), 0);

        let notes = board.get(&Query::default());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message(), "pinned");
        assert_eq!(board.pins(), vec![Location::new(1, 0)]);
    }

    #[test]
    fn clear_removes_everything() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "a").unwrap();
        board.post(Location::new(2, 2), "red", "b").unwrap();
        board.pin(Location::new(0, 0)).unwrap();

        assert_eq!(board.clear(), 2);
        assert!(board.is_empty());
        assert!(board.get(&Query::default()).is_empty());
        assert!(board.pins().is_empty());
    }

    #[test]
    fn error_response_repeats_kind() {
        let mut board = board();
        board.post(Location::new(0, 0), "red", "a").unwrap();
        let error = board.post(Location::new(0, 0), "red", "b").unwrap_err();
        assert_eq!(error.response(), "ERROR OVERLAP OVERLAP");
        assert_eq!(
            no_note_at(Location::new(1, 2)).response(),
            "ERROR NOTE_NOT_FOUND NOTE_NOT_FOUND"
        );
    }
}

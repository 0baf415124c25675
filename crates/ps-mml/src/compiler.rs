//! The MML parser.
//!
//! Line oriented: a line may start with channel letters (`A`-`Z`) that
//! select which channels its commands apply to; without them the line
//! drives channel `A` only. Every command is broadcast to all selected
//! channels.

use arrayvec::ArrayVec;
use ps_ir::pitch::{self, Accidental, Letter, MAX_OCTAVE};
use ps_ir::{
    Articulation, ChannelStats, FrameMap, SeqFrame, MAX_CHANNELS, MAX_DURATION_SCALE, MAX_NOTE_CODE,
    MAX_VOLUME,
};

use crate::channel::ChannelState;
use crate::cursor::{Cursor, Position};
use crate::error::{ErrorKind, ErrorObserver, ParseError};

/// Highest octave accepted by the `o` command.
const MAX_SET_OCTAVE: u8 = 6;

/// Successful compile output.
#[derive(Clone, Debug)]
pub struct Compiled {
    pub map: FrameMap,
    /// Timing totals for every channel touched by the source.
    pub stats: Vec<ChannelStats>,
}

/// Reusable compiler configured with the target sample rate.
pub struct Compiler<'h> {
    sample_rate: u32,
    observer: Option<Box<dyn ErrorObserver + 'h>>,
}

impl<'h> Compiler<'h> {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            observer: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Install a handler told about the error that aborts a compile.
    pub fn set_error_handler(&mut self, handler: impl ErrorObserver + 'h) {
        self.observer = Some(Box::new(handler));
    }

    /// Compile MML text into per-channel frames.
    pub fn compile(&mut self, text: &str) -> Result<Compiled, ParseError> {
        let result = Parser::new(text, self.sample_rate).run();
        if let (Err(err), Some(observer)) = (&result, self.observer.as_mut()) {
            observer.on_error(&err.kind.to_string(), err.line, err.column);
        }
        result
    }
}

/// Compile `text` for playback at `sample_rate`.
pub fn compile(text: &str, sample_rate: u32) -> Result<Compiled, ParseError> {
    Compiler::new(sample_rate).compile(text)
}

/// What a note event sounds like.
#[derive(Clone, Copy, Debug)]
enum Pitch {
    Pause,
    Code(u8),
    Letter(Letter, Accidental),
}

/// A parsed note event, before it is applied to channels.
#[derive(Clone, Copy, Debug)]
struct NoteEvent {
    pitch: Pitch,
    length: Option<u32>,
    dots: u32,
    at: Position,
}

fn error(kind: ErrorKind, at: Position) -> ParseError {
    ParseError::new(kind, at.line, at.column)
}

/// Parsing context for one compile.
struct Parser<'a> {
    cursor: Cursor<'a>,
    sample_rate: u32,
    channels: ArrayVec<ChannelState, MAX_CHANNELS>,
    map: FrameMap,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, sample_rate: u32) -> Self {
        Self {
            cursor: Cursor::new(text),
            sample_rate,
            channels: ArrayVec::new(),
            map: FrameMap::new(),
        }
    }

    fn run(mut self) -> Result<Compiled, ParseError> {
        self.reset_active();
        while let Some(b) = self.cursor.peek() {
            let at = self.cursor.position();
            match b {
                b'\n' => {
                    self.cursor.bump();
                    self.reset_active();
                }
                b'#' | b';' => self.cursor.skip_line(),
                b'|' => {
                    self.cursor.bump();
                }
                _ if b <= b' ' => {
                    self.cursor.bump();
                }
                b'A'..=b'Z' => {
                    if at.column != 1 {
                        return Err(error(ErrorKind::MisplacedChannelSelector, at));
                    }
                    self.select_channels();
                }
                b'&' => {
                    self.cursor.bump();
                    self.active().for_each(|st| st.pending_tie = true);
                }
                b'o' => self.set_octave()?,
                b'l' => self.set_default_length()?,
                b't' => self.set_tempo()?,
                b'v' => self.set_volume()?,
                b'<' => self.step_octave(at, false)?,
                b'>' => self.step_octave(at, true)?,
                b'm' => self.set_articulation()?,
                b'a'..=b'g' | b'n' | b'p' | b'r' => {
                    let note = self.read_note()?;
                    self.emit(&note)?;
                }
                _ => {
                    let c = self.cursor.peek_char().unwrap_or(b as char);
                    return Err(error(ErrorKind::UnknownCommand(c), at));
                }
            }
        }

        if self.channels.iter().any(|st| st.pending_tie) {
            return Err(error(ErrorKind::DanglingTie, self.cursor.position()));
        }

        let stats: Vec<ChannelStats> = self
            .channels
            .iter()
            .enumerate()
            .map(|(i, st)| st.stats(i))
            .collect();
        for s in &stats {
            tracing::debug!(
                channel = s.channel,
                seconds = s.seconds,
                time_units = s.time_units,
                "compiled channel"
            );
        }
        Ok(Compiled {
            map: self.map,
            stats,
        })
    }

    fn active(&mut self) -> impl Iterator<Item = &mut ChannelState> {
        self.channels.iter_mut().filter(|st| st.active)
    }

    /// Make sure state exists for `index` and mark it active.
    fn enable_channel(&mut self, index: usize) {
        while self.channels.len() <= index {
            self.channels.push(ChannelState::new());
        }
        self.channels[index].active = true;
    }

    /// A new line drives channel A only.
    fn reset_active(&mut self) {
        for st in self.channels.iter_mut() {
            st.active = false;
        }
        self.enable_channel(0);
    }

    fn select_channels(&mut self) {
        for st in self.channels.iter_mut() {
            st.active = false;
        }
        while let Some(b @ b'A'..=b'Z') = self.cursor.peek() {
            self.cursor.bump();
            self.enable_channel((b - b'A') as usize);
        }
    }

    fn set_octave(&mut self) -> Result<(), ParseError> {
        self.cursor.bump();
        let at = self.cursor.position();
        let octave = match self.cursor.peek() {
            Some(b @ b'0'..=b'9') if b - b'0' <= MAX_SET_OCTAVE => b - b'0',
            _ => return Err(error(ErrorKind::InvalidOctave, at)),
        };
        self.cursor.bump();
        self.active().for_each(|st| st.octave = octave);
        Ok(())
    }

    fn set_default_length(&mut self) -> Result<(), ParseError> {
        self.cursor.bump();
        let at = self.cursor.position();
        let length = self
            .cursor
            .read_number()
            .filter(|&l| l > 0)
            .ok_or_else(|| error(ErrorKind::InvalidLength, at))?;
        let dots = self.cursor.eat_run(b'.');
        self.active().for_each(|st| {
            st.length = length;
            st.dots = dots;
        });
        Ok(())
    }

    fn set_tempo(&mut self) -> Result<(), ParseError> {
        self.cursor.bump();
        let at = self.cursor.position();
        let tempo = self
            .cursor
            .read_number()
            .filter(|&t| t > 0)
            .ok_or_else(|| error(ErrorKind::InvalidTempo, at))?;
        self.active().for_each(|st| st.tempo = tempo);
        Ok(())
    }

    fn set_volume(&mut self) -> Result<(), ParseError> {
        self.cursor.bump();
        let at = self.cursor.position();
        let volume = self
            .cursor
            .read_number()
            .filter(|&v| v <= MAX_VOLUME as u32)
            .ok_or_else(|| error(ErrorKind::InvalidVolume, at))?;
        self.active().for_each(|st| st.volume = volume as u8);
        Ok(())
    }

    fn step_octave(&mut self, at: Position, up: bool) -> Result<(), ParseError> {
        self.cursor.bump();
        for st in self.active() {
            if up {
                if st.octave >= MAX_OCTAVE {
                    return Err(error(ErrorKind::OctaveStepUp, at));
                }
                st.octave += 1;
            } else {
                if st.octave == 0 {
                    return Err(error(ErrorKind::OctaveStepDown, at));
                }
                st.octave -= 1;
            }
        }
        Ok(())
    }

    fn set_articulation(&mut self) -> Result<(), ParseError> {
        self.cursor.bump();
        let at = self.cursor.position();
        let articulation = self
            .cursor
            .peek()
            .and_then(Articulation::from_letter)
            .ok_or_else(|| error(ErrorKind::InvalidArticulation, at))?;
        self.cursor.bump();
        self.active().for_each(|st| st.articulation = articulation);
        Ok(())
    }

    /// `letter accidental? length? dots?`, `n code dots?` or `(p|r) length? dots?`.
    fn read_note(&mut self) -> Result<NoteEvent, ParseError> {
        let at = self.cursor.position();
        let head = self.cursor.bump().unwrap_or_default();

        let pitch = match head {
            b'p' | b'r' => Pitch::Pause,
            b'n' => {
                let code_at = self.cursor.position();
                let code = self
                    .cursor
                    .read_number()
                    .filter(|&c| c <= MAX_NOTE_CODE as u32)
                    .ok_or_else(|| error(ErrorKind::InvalidNoteCode, code_at))?;
                Pitch::Code(code as u8)
            }
            _ => {
                let letter = Letter::from_ascii(head)
                    .ok_or_else(|| error(ErrorKind::UnknownCommand(head as char), at))?;
                let mut accidental = Accidental::Natural;
                while let Some(acc) = self.cursor.peek().and_then(Accidental::from_ascii) {
                    let acc_at = self.cursor.position();
                    if accidental != Accidental::Natural || !acc.applies_to(letter) {
                        return Err(error(ErrorKind::InvalidAccidental, acc_at));
                    }
                    accidental = acc;
                    self.cursor.bump();
                }
                Pitch::Letter(letter, accidental)
            }
        };

        let mut length = None;
        if !matches!(pitch, Pitch::Code(_)) && self.cursor.at_digit() {
            let length_at = self.cursor.position();
            length = Some(
                self.cursor
                    .read_number()
                    .filter(|&l| l > 0)
                    .ok_or_else(|| error(ErrorKind::InvalidLength, length_at))?,
            );
        }
        let dots = self.cursor.eat_run(b'.');

        Ok(NoteEvent {
            pitch,
            length,
            dots,
            at,
        })
    }

    /// Apply a note event to every active channel, in channel order.
    fn emit(&mut self, note: &NoteEvent) -> Result<(), ParseError> {
        let sample_rate = self.sample_rate;
        for (index, st) in self.channels.iter_mut().enumerate() {
            if st.active {
                emit_on_channel(&mut self.map, index, st, note, sample_rate)?;
            }
        }
        Ok(())
    }
}

fn emit_on_channel(
    map: &mut FrameMap,
    index: usize,
    st: &mut ChannelState,
    note: &NoteEvent,
    sample_rate: u32,
) -> Result<(), ParseError> {
    let (length, dots) = match (note.length, note.dots) {
        (Some(length), dots) => (length, dots),
        (None, 0) => (st.length, st.dots),
        (None, dots) => (st.length, dots),
    };
    let frequency = match note.pitch {
        Pitch::Pause | Pitch::Code(0) => 0,
        Pitch::Code(code) => pitch::frequency_from_code(code),
        Pitch::Letter(letter, accidental) => pitch::frequency_from_note(letter, accidental, st.octave),
    };
    let units = st.advance(length, dots, sample_rate);
    if units == 0 {
        return Err(error(ErrorKind::ZeroDuration, note.at));
    }
    let release_point = st.articulation.release_point();
    let list = map
        .channel_mut(index)
        .map_err(|_| error(ErrorKind::OutOfMemory, note.at))?;

    if st.pending_tie {
        st.pending_tie = false;
        let last = list
            .last_mut()
            .ok_or_else(|| error(ErrorKind::TieWithoutNote, note.at))?;
        let total = last.duration_scale as u64 + units;
        if total > MAX_DURATION_SCALE as u64 {
            return Err(error(ErrorKind::DurationOverflow, note.at));
        }
        last.duration_scale = total as u32;
        last.release_point = release_point;
        return Ok(());
    }

    if units > MAX_DURATION_SCALE as u64 {
        return Err(error(ErrorKind::DurationOverflow, note.at));
    }
    let frame = if frequency == 0 {
        SeqFrame::pause(units as u32, release_point)
    } else {
        SeqFrame::note(frequency, st.volume, units as u32, release_point)
    };
    list.push(frame)
        .map_err(|_| error(ErrorKind::OutOfMemory, note.at))
}

use std::fmt;

/// One of the twelve equal-tempered note names, octave ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    /// C
    C,
    /// C#
    CSharp,
    /// D
    D,
    /// D#
    DSharp,
    /// E
    E,
    /// F
    F,
    /// F#
    FSharp,
    /// G
    G,
    /// G#
    GSharp,
    /// A
    A,
    /// A#
    ASharp,
    /// B
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order starting at C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class of a MIDI-style note index. Negative indices wrap.
    pub fn from_note_index(note_index: i32) -> Self {
        Self::ALL[note_index.rem_euclid(12) as usize]
    }

    /// Display label, sharps spelled with `#`.
    pub fn label(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

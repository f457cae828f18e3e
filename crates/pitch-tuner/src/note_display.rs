use pitch_tuner_core::NoteObservation;

/// Width of the cents meter on each side of centre.
const METER_HALF_WIDTH: i32 = 10;
/// Cents represented by one meter cell.
const CENTS_PER_CELL: i32 = 5;

/// Renders stable readings as console lines.
#[derive(Debug, Clone, Copy)]
pub struct NoteDisplay {
    in_tune_cents: u32,
}

impl NoteDisplay {
    /// Display that marks readings within `in_tune_cents` of the reference.
    pub fn new(in_tune_cents: u32) -> Self {
        Self { in_tune_cents }
    }

    /// Whether `observation` is close enough to count as tuned.
    pub fn is_in_tune(&self, observation: &NoteObservation) -> bool {
        observation.cents_deviation.unsigned_abs() < self.in_tune_cents
    }

    /// One line: note and octave, signed cents, a meter, the measured
    /// frequency and the in-tune marker.
    pub fn render(&self, observation: &NoteObservation) -> String {
        let note = format!("{}{}", observation.name, observation.octave);
        let marker = if self.is_in_tune(observation) {
            "  in tune"
        } else {
            ""
        };

        format!(
            "{:<4} {:>+4}¢ {} {:>7.1} Hz{}",
            note,
            observation.cents_deviation,
            meter(observation.cents_deviation),
            observation.observed_frequency_hz,
            marker
        )
    }
}

/// `[----|----]` style needle; flat readings lean left.
fn meter(cents: i32) -> String {
    let offset = (cents / CENTS_PER_CELL).clamp(-METER_HALF_WIDTH, METER_HALF_WIDTH);
    let needle = METER_HALF_WIDTH + offset;

    let cells: String = (0..=2 * METER_HALF_WIDTH)
        .map(|i| {
            if i == needle {
                '|'
            } else if i == METER_HALF_WIDTH {
                '+'
            } else {
                '-'
            }
        })
        .collect();

    format!("[{}]", cells)
}

//! Caller side policy applied to OCR output before a record is built.

use serde::Deserialize;

use super::PlateReading;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateFormat {
    /// Any non-empty text is accepted.
    #[default]
    Any,
    /// UK style `LLNNLLL`, letters and digits swapped back where OCR
    /// confused them.
    Uk,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlateTextPolicy {
    /// Uppercase and drop whitespace.
    pub normalize: bool,
    pub format: PlateFormat,
    /// Readings below this confidence are treated as illegible.
    pub min_text_score: Option<f32>,
}

impl Default for PlateTextPolicy {
    fn default() -> Self {
        Self {
            normalize: true,
            format: PlateFormat::Any,
            min_text_score: None,
        }
    }
}

impl PlateTextPolicy {
    /// Returns the reading the record builder should see. Rejected readings
    /// come back with empty text.
    pub fn apply(&self, reading: PlateReading) -> PlateReading {
        if let Some(min_score) = self.min_text_score {
            if reading.score < min_score {
                return PlateReading::empty();
            }
        }

        let text = if self.normalize {
            reading
                .text
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_uppercase)
                .collect()
        } else {
            reading.text
        };

        let text = match self.format {
            PlateFormat::Any => Some(text),
            PlateFormat::Uk => format_uk(&text),
        };

        match text {
            Some(text) => PlateReading::new(text, reading.score),
            None => PlateReading::empty(),
        }
    }
}

const UK_PLATE_LEN: usize = 7;

#[derive(Clone, Copy)]
enum Slot {
    Letter,
    Digit,
}

const UK_LAYOUT: [Slot; UK_PLATE_LEN] = [
    Slot::Letter,
    Slot::Letter,
    Slot::Digit,
    Slot::Digit,
    Slot::Letter,
    Slot::Letter,
    Slot::Letter,
];

fn letter_to_digit(c: char) -> Option<char> {
    match c {
        'O' => Some('0'),
        'I' => Some('1'),
        'J' => Some('3'),
        'A' => Some('4'),
        'G' => Some('6'),
        'S' => Some('5'),
        _ => None,
    }
}

fn digit_to_letter(c: char) -> Option<char> {
    match c {
        '0' => Some('O'),
        '1' => Some('I'),
        '3' => Some('J'),
        '4' => Some('A'),
        '6' => Some('G'),
        '5' => Some('S'),
        _ => None,
    }
}

fn format_uk(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() != UK_PLATE_LEN {
        return None;
    }
    chars
        .iter()
        .zip(UK_LAYOUT)
        .map(|(&c, slot)| match slot {
            Slot::Letter if c.is_ascii_uppercase() => Some(c),
            Slot::Letter => digit_to_letter(c),
            Slot::Digit if c.is_ascii_digit() => Some(c),
            Slot::Digit => letter_to_digit(c),
        })
        .collect()
}

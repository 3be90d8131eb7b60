use crate::position::{format_coord, AxisMask, Position};

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Word {
    pub letter: u8,
    pub value: f64,
}

impl Word {
    // G/M code number with one decimal kept, so G38.2 becomes 382 and G0 becomes 0.
    pub fn code(&self) -> i32 {
        (self.value * 10.0).round() as i32
    }
}

// Address words of one line as the cycle emits them: a letter followed by a
// signed decimal. Blanks are ignored and a letter without a number is dropped.
pub fn parse_words(line: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut chars = line.chars().filter(|c| !c.is_ascii_whitespace()).peekable();

    while let Some(c) = chars.next() {
        if !c.is_ascii_alphabetic() {
            continue;
        }
        let mut number = String::new();
        while let Some(&d) = chars.peek() {
            let sign_ok = number.is_empty() && (d == '-' || d == '+');
            if !(d.is_ascii_digit() || d == '.' || sign_ok) {
                break;
            }
            number.push(d);
            chars.next();
        }
        if let Ok(value) = number.parse::<f64>() {
            words.push(Word { letter: c.to_ascii_uppercase() as u8, value });
        }
    }
    words
}

#[derive(Clone, Debug, Default)]
pub struct GcodeProgram {
    lines: Vec<String>,
    probe_distance: f64,
}

impl GcodeProgram {
    pub fn new(probe_distance: f64) -> Self {
        Self { lines: Vec::new(), probe_distance }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn set_probe_distance(&mut self, distance: f64) {
        self.probe_distance = distance;
    }

    pub fn push_directive(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    pub fn push_rapid(&mut self, position: &Position, axes: AxisMask) {
        self.lines.push(format!("G53G0{}", position.to_gcode(axes)));
    }

    pub fn push_probe(&mut self, axes: AxisMask, negative: bool) {
        let distance = format_coord(if negative { -self.probe_distance } else { self.probe_distance });
        let mut line = String::from("G38.3");
        for axis in axes.axes() {
            line.push(axis.letter());
            line.push_str(&distance);
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

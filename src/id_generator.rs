/// Alphanumeric ID generator for diagram entities
/// Generates short, case-insensitive IDs like "A7", "2K", etc.
/// Automatically expands to more digits when namespace is exhausted

const CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z',
];

#[derive(Debug, Clone)]
pub struct IdGenerator {
    /// Current ID length (starts at 2)
    length: usize,
    /// Counter for next ID
    counter: u64,
    /// Maximum value before needing to expand
    max_value: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_length(2)
    }

    pub fn with_length(length: usize) -> Self {
        let max_value = (CHARS.len() as u64).pow(length as u32);
        Self {
            length,
            counter: 0,
            max_value,
        }
    }

    /// Generate the next ID
    pub fn next(&mut self) -> String {
        if self.counter >= self.max_value {
            self.expand();
        }

        let id = self.encode(self.counter);
        self.counter += 1;
        id
    }

    /// Generate the next ID for which `is_taken` returns false
    pub fn next_unused(&mut self, is_taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.next();
            if !is_taken(&id) {
                return id;
            }
        }
    }

    /// Encode a number to base-36 alphanumeric string
    fn encode(&self, mut num: u64) -> String {
        let base = CHARS.len() as u64;
        let mut result = Vec::with_capacity(self.length);

        for _ in 0..self.length {
            let digit = (num % base) as usize;
            result.push(CHARS[digit]);
            num /= base;
        }

        result.reverse();
        result.into_iter().collect()
    }

    /// Expand to the next length
    fn expand(&mut self) {
        self.length += 1;
        self.max_value = (CHARS.len() as u64).pow(self.length as u32);
        // New namespace: every id of the new length is unused so far
        self.counter = 0;
    }

    /// Seed a generator past the highest decodable id among `existing_ids`.
    /// Ids that are not base-36 (e.g. "node-1") are ignored here and caught by `next_unused`.
    pub fn from_existing_ids<'a>(existing_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut max_len = 0usize;
        let mut max_counter: Option<u64> = None;

        for id in existing_ids {
            let Some(value) = Self::decode(id) else {
                continue;
            };
            if id.len() > max_len {
                max_len = id.len();
                max_counter = Some(value);
            } else if id.len() == max_len {
                max_counter = Some(max_counter.map_or(value, |m| m.max(value)));
            }
        }

        match max_counter {
            Some(counter) if max_len >= 2 => {
                let mut generator = Self::with_length(max_len);
                generator.counter = counter + 1;
                generator
            }
            _ => Self::new(),
        }
    }

    /// Decode an ID back to its counter value
    fn decode(id: &str) -> Option<u64> {
        if id.is_empty() {
            return None;
        }

        let base = CHARS.len() as u64;
        let mut result = 0u64;

        for c in id.chars() {
            let digit = CHARS.iter().position(|&ch| ch == c.to_ascii_uppercase())?;
            result = result.checked_mul(base)?.checked_add(digit as u64)?;
        }

        Some(result)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

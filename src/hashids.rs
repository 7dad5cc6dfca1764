//! Salted alphabet-shuffling encoder for lists of non-negative integers.
//!
//! Tokens are short and reversible, but carry no integrity check: they hide
//! sequential IDs from casual observers and nothing more.

use crate::config::{HasherConfig, MAX_MINIMUM_LENGTH};

const SEPARATORS: &str = "cfhistuCFHISTU";
const SEPARATOR_RATIO: f64 = 3.5;
const GUARD_RATIO: f64 = 12.0;

/// Core hashids encoder/decoder.
#[derive(Debug, Clone)]
pub struct Hashids {
    salt: Vec<char>,
    minimum_length: usize,
    alphabet: Vec<char>,
    separators: Vec<char>,
    guards: Vec<char>,
}

impl Hashids {
    /// Creates a new `Hashids` instance from a validated configuration.
    ///
    /// The alphabet is split into the value alphabet, separators (placed
    /// between values) and guards (used for padding), then shuffled by the salt.
    pub fn new(config: &HasherConfig) -> Hashids {
        let salt: Vec<char> = config.salt.chars().collect();
        let mut alphabet: Vec<char> = config.alphabet.chars().collect();

        let mut separators: Vec<char> = SEPARATORS
            .chars()
            .filter(|c| alphabet.contains(c))
            .collect();
        alphabet.retain(|c| !separators.contains(c));
        consistent_shuffle(&mut separators, &salt);

        if separators.is_empty()
            || alphabet.len() as f64 / separators.len() as f64 > SEPARATOR_RATIO
        {
            let mut wanted = (alphabet.len() as f64 / SEPARATOR_RATIO).ceil() as usize;
            if wanted == 1 {
                wanted += 1;
            }
            if wanted > separators.len() {
                let diff = wanted - separators.len();
                separators.extend(alphabet.drain(..diff));
            } else {
                separators.truncate(wanted);
            }
        }

        consistent_shuffle(&mut alphabet, &salt);

        let guard_count = (alphabet.len() as f64 / GUARD_RATIO).ceil() as usize;
        let guards: Vec<char> = if alphabet.len() < 3 {
            separators.drain(..guard_count).collect()
        } else {
            alphabet.drain(..guard_count).collect()
        };

        Hashids {
            salt,
            minimum_length: config.minimum_length.min(MAX_MINIMUM_LENGTH),
            alphabet,
            separators,
            guards,
        }
    }

    /// Encodes `numbers` into a single token. An empty slice gives an empty token.
    pub fn encode(&self, numbers: &[u64]) -> String {
        if numbers.is_empty() {
            return String::new();
        }

        let mut alphabet = self.alphabet.clone();
        let numbers_id: u64 = numbers
            .iter()
            .enumerate()
            .map(|(i, n)| n % (i as u64 + 100))
            .sum();

        let lottery = alphabet[(numbers_id % alphabet.len() as u64) as usize];
        let mut result = vec![lottery];
        let mut buffer = Vec::with_capacity(1 + self.salt.len() + alphabet.len());

        for (i, &number) in numbers.iter().enumerate() {
            buffer.clear();
            buffer.push(lottery);
            buffer.extend_from_slice(&self.salt);
            buffer.extend_from_slice(&alphabet);
            buffer.truncate(alphabet.len());
            consistent_shuffle(&mut alphabet, &buffer);

            let last = to_alphabet(number, &alphabet);
            result.extend_from_slice(&last);

            if i + 1 < numbers.len() {
                let reduced = number % (last[0] as u64 + i as u64);
                result.push(self.separators[(reduced % self.separators.len() as u64) as usize]);
            }
        }

        if result.len() < self.minimum_length {
            let index = (numbers_id + result[0] as u64) % self.guards.len() as u64;
            result.insert(0, self.guards[index as usize]);

            if result.len() < self.minimum_length {
                let index = (numbers_id + result[2] as u64) % self.guards.len() as u64;
                result.push(self.guards[index as usize]);
            }
        }

        let half = alphabet.len() / 2;
        while result.len() < self.minimum_length {
            let key = alphabet.clone();
            consistent_shuffle(&mut alphabet, &key);

            let mut padded = Vec::with_capacity(result.len() + alphabet.len());
            padded.extend_from_slice(&alphabet[half..]);
            padded.extend_from_slice(&result);
            padded.extend_from_slice(&alphabet[..half]);
            result = padded;

            let excess = result.len().saturating_sub(self.minimum_length);
            if excess > 0 {
                let start = excess / 2;
                result = result[start..start + self.minimum_length].to_vec();
            }
        }

        result.into_iter().collect()
    }

    /// Decodes a token into the numbers it carries.
    ///
    /// Tokens that were not produced by this configuration decode to an empty
    /// vector: every candidate result is re-encoded and compared to the input.
    pub fn decode(&self, token: &str) -> Vec<u64> {
        let chars: Vec<char> = token.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let parts: Vec<&[char]> = chars.split(|c| self.guards.contains(c)).collect();
        let core = match parts.len() {
            2 | 3 => parts[1],
            _ => parts[0],
        };
        let Some((&lottery, rest)) = core.split_first() else {
            return Vec::new();
        };

        let mut alphabet = self.alphabet.clone();
        let mut buffer = Vec::with_capacity(1 + self.salt.len() + alphabet.len());
        let mut numbers = Vec::new();

        for chunk in rest.split(|c| self.separators.contains(c)) {
            buffer.clear();
            buffer.push(lottery);
            buffer.extend_from_slice(&self.salt);
            buffer.extend_from_slice(&alphabet);
            buffer.truncate(alphabet.len());
            consistent_shuffle(&mut alphabet, &buffer);

            match from_alphabet(chunk, &alphabet) {
                Some(number) => numbers.push(number),
                None => return Vec::new(),
            }
        }

        if self.encode(&numbers) != token {
            return Vec::new();
        }
        numbers
    }
}

fn consistent_shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() {
        return;
    }
    let mut v = 0;
    let mut p = 0;
    for i in (1..alphabet.len()).rev() {
        v %= salt.len();
        let code = salt[v] as usize;
        p += code;
        let j = (code + v + p) % i;
        alphabet.swap(i, j);
        v += 1;
    }
}

fn to_alphabet(mut number: u64, alphabet: &[char]) -> Vec<char> {
    let base = alphabet.len() as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(alphabet[(number % base) as usize]);
        number /= base;
        if number == 0 {
            break;
        }
    }
    digits.reverse();
    digits
}

// Empty chunks, foreign characters and overflow all mean "not ours".
fn from_alphabet(chunk: &[char], alphabet: &[char]) -> Option<u64> {
    if chunk.is_empty() {
        return None;
    }
    let base = alphabet.len() as u64;
    chunk.iter().try_fold(0u64, |acc, c| {
        let digit = alphabet.iter().position(|a| a == c)? as u64;
        acc.checked_mul(base)?.checked_add(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Uniform, Rng};

    fn hashids(salt: &str, minimum_length: usize) -> Hashids {
        Hashids::new(&HasherConfig::new(salt).minimum_length(minimum_length))
    }

    #[test]
    fn test_known_tokens() {
        let test_cases = vec![
            ("", 0, vec![1], "jR"),
            ("", 0, vec![1, 2, 3], "o2fXhV"),
            ("", 10, vec![1], "VolejRejNm"),
            ("this is my salt", 0, vec![12345], "NkK9"),
            ("this is my salt", 0, vec![1, 2, 3], "laHquq"),
            ("this is my salt", 8, vec![1], "gB0NV05e"),
            ("My Project", 0, vec![1, 2, 3], "Z4UrtW"),
            ("My Project", 10, vec![1], "jEWOEVpQx3"),
            ("s", 8, vec![0], "jEByAB31"),
            ("s", 8, vec![1], "9JgqK6em"),
            ("s", 8, vec![123], "4V6YxNrM"),
            ("s", 8, vec![1, 2, 3], "6jVSbs36"),
        ];

        for (salt, minimum_length, numbers, expected) in test_cases {
            let h = hashids(salt, minimum_length);
            assert_eq!(h.encode(&numbers), expected);
            assert_eq!(h.decode(expected), numbers);
        }
    }

    #[test]
    fn test_custom_alphabet() {
        let config = HasherConfig::new("s")
            .minimum_length(8)
            .alphabet("abcdefghijklmnop")
            .unwrap();
        let h = Hashids::new(&config);
        assert_eq!(h.encode(&[123]), "pndmgnpd");
        assert_eq!(h.decode("pndmgnpd"), vec![123]);
    }

    #[test]
    fn test_minimum_length() {
        let h = hashids("pad", 25);
        for n in [0, 1, 99, 123_456_789, u64::MAX] {
            let token = h.encode(&[n]);
            assert_eq!(token.chars().count(), 25);
            assert_eq!(h.decode(&token), vec![n]);
        }
    }

    #[test]
    fn test_empty() {
        let h = hashids("s", 8);
        assert_eq!(h.encode(&[]), "");
        assert!(h.decode("").is_empty());
    }

    #[test]
    fn test_foreign_tokens() {
        let h = hashids("s", 8);
        let other = hashids("other salt", 8);

        assert!(h.decode(&other.encode(&[123])).is_empty());
        assert!(h.decode("not-a-token!").is_empty());
        assert!(h.decode("4V6YxNrN").is_empty());
        assert!(h.decode("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_empty());
    }

    #[test]
    fn test_random_roundtrips() {
        let h = hashids("random", 6);
        let mut rng = rand::thread_rng();
        let range = Uniform::new(0u64, u64::MAX);

        for _ in 0..2_000 {
            let numbers: Vec<u64> = (0..rng.gen_range(1..4)).map(|_| rng.sample(range)).collect();
            let token = h.encode(&numbers);
            assert_eq!(h.decode(&token), numbers, "Failed at numbers: {:?}", numbers);
        }
    }

    #[test]
    fn test_minimum_length_is_capped() {
        let hashids = hashids("s", 1_000_000_000);
        let token = hashids.encode(&[1]);
        assert_eq!(token.len(), MAX_MINIMUM_LENGTH);
        assert_eq!(hashids.decode(&token), vec![1]);
    }
}

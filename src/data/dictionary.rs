use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Index of a symbol in a `Dictionary`.
pub type Token = usize;

const BOS: &str = "<s>";
const PAD: &str = "<pad>";
const EOS: &str = "</s>";
const UNK: &str = "<unk>";

/// Maps symbols to token indices.
///
/// The four special symbols always occupy the first slots:
/// `<s>` = 0, `<pad>` = 1, `</s>` = 2, `<unk>` = 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SymbolTable")]
pub struct Dictionary {
    symbols: Vec<String>,
    #[serde(skip)]
    indices: HashMap<String, Token>,
}

/// On-disk form of a `Dictionary`: the reverse index is rebuilt on load.
#[derive(Deserialize)]
struct SymbolTable {
    symbols: Vec<String>,
}

impl From<SymbolTable> for Dictionary {
    fn from(table: SymbolTable) -> Dictionary {
        let mut indices = HashMap::with_capacity(table.symbols.len());
        for (idx, sym) in table.symbols.iter().enumerate() {
            indices.entry(sym.clone()).or_insert(idx);
        }
        Dictionary { symbols: table.symbols, indices }
    }
}

#[allow(clippy::len_without_is_empty)]
impl Dictionary {
    pub fn new() -> Dictionary {
        let mut dict = Dictionary { symbols: Vec::new(), indices: HashMap::new() };
        for sym in [BOS, PAD, EOS, UNK] {
            dict.add_symbol(sym);
        }
        dict
    }

    /// Builds a dictionary holding every whitespace-separated word of `lines`.
    pub fn from_lines<'a, I>(lines: I) -> Dictionary
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut dict = Dictionary::new();
        for line in lines {
            for word in line.split_whitespace() {
                dict.add_symbol(word);
            }
        }
        dict
    }

    /// Adds `sym` if unseen and returns its index.
    pub fn add_symbol(&mut self, sym: &str) -> Token {
        if let Some(&idx) = self.indices.get(sym) {
            return idx;
        }
        let idx = self.symbols.len();
        self.symbols.push(sym.to_string());
        self.indices.insert(sym.to_string(), idx);
        idx
    }

    /// Index of `sym`, or `unk()` when the symbol is not in the dictionary.
    pub fn index(&self, sym: &str) -> Token {
        self.indices.get(sym).copied().unwrap_or_else(|| self.unk())
    }

    pub fn symbol(&self, idx: Token) -> &str {
        self.symbols.get(idx).map(String::as_str).unwrap_or(UNK)
    }

    pub fn bos(&self) -> Token {
        0
    }

    pub fn pad(&self) -> Token {
        1
    }

    pub fn eos(&self) -> Token {
        2
    }

    pub fn unk(&self) -> Token {
        3
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Only the four special symbols are present.
    pub fn has_only_specials(&self) -> bool {
        self.symbols.len() <= 4
    }

    /// Tokenizes a line on whitespace; unseen words map to `<unk>`.
    pub fn encode_line(&self, line: &str, append_eos: bool) -> Vec<Token> {
        let tokens = line.split_whitespace().map(|w| self.index(w));
        self.finish_line(tokens.collect(), append_eos)
    }

    /// Like `encode_line`, but unseen words become new symbols.
    pub fn add_line(&mut self, line: &str, append_eos: bool) -> Vec<Token> {
        let tokens = line.split_whitespace().map(|w| self.add_symbol(w)).collect();
        self.finish_line(tokens, append_eos)
    }

    fn finish_line(&self, mut tokens: Vec<Token>, append_eos: bool) -> Vec<Token> {
        if append_eos {
            tokens.push(self.eos());
        }
        tokens
    }

    /// Space-joined symbols, with pad and eos dropped.
    pub fn string(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter(|&&t| t != self.pad() && t != self.eos())
            .map(|&t| self.symbol(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serializes the symbol table to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Loads a dictionary written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<Dictionary> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Dictionary::new()
    }
}

//! Token types for the Vela lexer

use phf::phf_map;

/// Token types for Vela
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    // ========== Punctuation and operators ==========
    Comma,      // ,
    Semicolon,  // ;
    Colon,      // :
    ColonColon, // ::
    Question,   // ?
    Arrow,      // ->
    Dot,        // .
    DotDot,     // ..
    DotDotEq,   // ..=
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusPlus,   // ++ (prefix only)
    MinusMinus, // -- (prefix only)
    Eq,         // =
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    EqEq,       // ==
    NotEq,      // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    Shl,        // <<
    Shr,        // >>
    Amp,        // &
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    Bang,       // !

    // ========== Brackets ==========
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }

    // ========== Identifiers and Literals ==========
    Ident,
    IntLit,
    FloatLit,
    StrLit,

    // ========== Keywords ==========
    And,
    Bool,
    Break,
    Class,
    Const,
    Continue,
    Default,
    Else,
    False,
    Float,
    Fn,
    For,
    If,
    Import,
    Int,
    Null,
    Or,
    Private,
    Protected,
    Public,
    Ref,
    Return,
    Str,
    Super,
    Switch,
    This,
    True,
    Type,
    Typeof,
    Var,
    While,

    // ========== Synthetic ==========
    /// Implicit statement terminator synthesized at plausible line ends.
    EndOfLine,
    Eof,
    /// Placeholder kind for default-constructed tokens.
    #[default]
    None,
}

/// Keyword lookup table using a perfect hash map for O(1) lookup.
///
/// Maps source text (e.g. `"fn"`, `"class"`) to `TokenKind` variants. When the
/// lexer scans an identifier it checks this map to decide whether the text is
/// a keyword or a plain identifier. `phf` computes the table at compile time,
/// so there is no runtime initialization cost.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and" => TokenKind::And,
    "bool" => TokenKind::Bool,
    "break" => TokenKind::Break,
    "class" => TokenKind::Class,
    "const" => TokenKind::Const,
    "continue" => TokenKind::Continue,
    "default" => TokenKind::Default,
    "else" => TokenKind::Else,
    "false" => TokenKind::False,
    "float" => TokenKind::Float,
    "fn" => TokenKind::Fn,
    "for" => TokenKind::For,
    "if" => TokenKind::If,
    "import" => TokenKind::Import,
    "int" => TokenKind::Int,
    "null" => TokenKind::Null,
    "or" => TokenKind::Or,
    "private" => TokenKind::Private,
    "protected" => TokenKind::Protected,
    "public" => TokenKind::Public,
    "ref" => TokenKind::Ref,
    "return" => TokenKind::Return,
    "string" => TokenKind::Str,
    "super" => TokenKind::Super,
    "switch" => TokenKind::Switch,
    "this" => TokenKind::This,
    "true" => TokenKind::True,
    "type" => TokenKind::Type,
    "typeof" => TokenKind::Typeof,
    "var" => TokenKind::Var,
    "while" => TokenKind::While,
};

/// A token with its kind, lexeme, and position.
///
/// `line` is 1-based; `start`/`end` are 0-based `[start, end)` byte columns
/// into the source line the token starts on. String literal tokens carry the
/// unescaped contents as their lexeme; all other non-synthetic tokens carry
/// the exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, start: usize, end: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            start,
            end,
        }
    }
}

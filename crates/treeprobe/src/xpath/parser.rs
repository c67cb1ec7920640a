//! Tokenizer and recursive-descent parser for the path language.

use std::fmt;

/// Error produced while parsing an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Byte offset of the offending token
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

// =============================================================================
// AST
// =============================================================================

/// Navigation axis of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `child::`
    Child,
    /// `descendant::`
    Descendant,
    /// `descendant-or-self::`
    DescendantOrSelf,
    /// `parent::`
    Parent,
    /// `ancestor::`
    Ancestor,
    /// `ancestor-or-self::`
    AncestorOrSelf,
    /// `following-sibling::`
    FollowingSibling,
    /// `preceding-sibling::`
    PrecedingSibling,
    /// `self::`
    SelfAxis,
    /// `attribute::` or `@`
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            "attribute" => Self::Attribute,
            _ => return None,
        })
    }

    /// Reverse axes number their nodes nearest-first
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        matches!(
            self,
            Self::Parent | Self::Ancestor | Self::AncestorOrSelf | Self::PrecedingSibling
        )
    }
}

/// Node test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`: any node of the axis' principal kind
    Any,
    /// `node()`: any node
    Node,
    /// A local name
    Name(String),
}

/// One location step
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Axis
    pub axis: Axis,
    /// Node test
    pub test: NodeTest,
    /// Filter predicates
    pub predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `position()`
    Position,
    /// `last()`
    Last,
    /// `count(node-set)`
    Count,
    /// `name(node-set?)`
    Name,
    /// `local-name(node-set?)`
    LocalName,
    /// `string(object?)`
    String,
    /// `contains(string, string)`
    Contains,
    /// `starts-with(string, string)`
    StartsWith,
    /// `normalize-space(string?)`
    NormalizeSpace,
    /// `concat(string, string, ...)`
    Concat,
    /// `not(boolean)`
    Not,
    /// `true()`
    True,
    /// `false()`
    False,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Self::Position,
            "last" => Self::Last,
            "count" => Self::Count,
            "name" => Self::Name,
            "local-name" => Self::LocalName,
            "string" => Self::String,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "normalize-space" => Self::NormalizeSpace,
            "concat" => Self::Concat,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            _ => return None,
        })
    }

    /// Accepted argument counts, inclusive; `None` means unbounded
    const fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Position | Self::Last | Self::True | Self::False => (0, Some(0)),
            Self::Count | Self::Not => (1, Some(1)),
            Self::Name | Self::LocalName | Self::String | Self::NormalizeSpace => (0, Some(1)),
            Self::Contains | Self::StartsWith => (2, Some(2)),
            Self::Concat => (2, None),
        }
    }
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a or b`
    Or(Box<Expr>, Box<Expr>),
    /// `a and b`
    And(Box<Expr>, Box<Expr>),
    /// Comparison
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// `a | b`
    Union(Box<Expr>, Box<Expr>),
    /// Unary minus
    Negate(Box<Expr>),
    /// Location path
    Path {
        /// Starts at the document root
        absolute: bool,
        /// Steps
        steps: Vec<Step>,
    },
    /// Primary expression with predicates and a trailing relative path
    Filter {
        /// The primary expression
        primary: Box<Expr>,
        /// Predicates applied to the primary's node-set
        predicates: Vec<Expr>,
        /// Steps applied after the predicates
        steps: Vec<Step>,
    },
    /// String literal
    Literal(String),
    /// Number literal
    Number(f64),
    /// Function call
    Call(Function, Vec<Expr>),
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    Pipe,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Star,
    Minus,
    DoubleColon,
    Name(String),
    Literal(String),
    Number(f64),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while let Some(&(offset, c)) = chars.get(i) {
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if peek(i + 1) == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '*' => {
                i += 1;
                Token::Star
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::Ne
            }
            '<' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::Le
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::Ge
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            ':' if peek(i + 1) == Some(':') => {
                i += 2;
                Token::DoubleColon
            }
            '.' if peek(i + 1) == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if !peek(i + 1).is_some_and(|n| n.is_ascii_digit()) => {
                i += 1;
                Token::Dot
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while chars.get(end).is_some_and(|(_, ch)| *ch != quote) {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(ParseError {
                        offset,
                        message: "unterminated string literal".to_string(),
                    });
                }
                let text: String = chars[start..end].iter().map(|(_, ch)| *ch).collect();
                i = end + 1;
                Token::Literal(text)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|(_, ch)| ch.is_ascii_digit() || *ch == '.')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, ch)| *ch).collect();
                let value = text.parse::<f64>().map_err(|_| ParseError {
                    offset,
                    message: format!("invalid number '{text}'"),
                })?;
                Token::Number(value)
            }
            c if is_name_start(c) => {
                let start = i;
                while chars.get(i).is_some_and(|(_, ch)| is_name_char(*ch)) {
                    i += 1;
                }
                // a trailing '.' belongs to the next token (e.g. `a/..`)
                while i > start + 1 && chars[i - 1].1 == '.' {
                    i -= 1;
                }
                Token::Name(chars[start..i].iter().map(|(_, ch)| *ch).collect())
            }
            other => {
                return Err(ParseError {
                    offset,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };
        tokens.push((offset, token));
    }
    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

/// Parse an expression
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError {
            offset: 0,
            message: "empty expression".to_string(),
        });
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(_, t)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        let offset = self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o);
        ParseError {
            offset,
            message: message.to_string(),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_keyword("and") {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::Ne) => CompareOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                name != "node" && matches!(self.peek_at(1), Some(Token::LParen))
            }
            _ => false,
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn parse_path_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.starts_primary() {
            return self.parse_location_path();
        }
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        if matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            self.parse_relative_steps(&mut steps, true)?;
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.error("expected an expression"));
        };
        match token {
            Token::Literal(text) => Ok(Expr::Literal(text)),
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Name(name) => {
                let function = Function::from_name(&name).ok_or_else(|| {
                    self.pos -= 1;
                    self.error(&format!("unknown function '{name}'"))
                })?;
                self.expect(&Token::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma, "',' or ')'")?;
                    }
                }
                let (min, max) = function.arity();
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(self.error(&format!(
                        "wrong number of arguments for '{name}()': {}",
                        args.len()
                    )));
                }
                Ok(Expr::Call(function, args))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected an expression"))
            }
        }
    }

    fn parse_location_path(&mut self) -> Result<Expr, ParseError> {
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    steps.push(self.parse_step()?);
                    self.parse_relative_steps(&mut steps, false)?;
                }
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.parse_relative_steps(&mut steps, true)?;
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            _ if self.starts_step() => {
                steps.push(self.parse_step()?);
                self.parse_relative_steps(&mut steps, false)?;
                Ok(Expr::Path {
                    absolute: false,
                    steps,
                })
            }
            _ => Err(self.error("expected a location path")),
        }
    }

    /// Parse `(/ step | // step)*`; with `require_one` at least one separator
    /// must follow.
    fn parse_relative_steps(
        &mut self,
        steps: &mut Vec<Step>,
        require_one: bool,
    ) -> Result<(), ParseError> {
        let mut seen = false;
        loop {
            match self.peek() {
                Some(Token::Slash) => self.pos += 1,
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                }
                _ => break,
            }
            seen = true;
            steps.push(self.parse_step()?);
        }
        if require_one && !seen {
            return Err(self.error("expected '/' or '//'"));
        }
        Ok(())
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = Axis::from_name(name)
                .ok_or_else(|| self.error(&format!("unknown axis '{name}'")))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let Some(token) = self.advance() else {
            return Err(self.error("expected a node test"));
        };
        let test = match token {
            Token::Star => NodeTest::Any,
            Token::Name(name) if name == "node" && self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                self.expect(&Token::RParen, "')'")?;
                NodeTest::Node
            }
            Token::Name(name) => NodeTest::Name(name),
            _ => {
                self.pos -= 1;
                return Err(self.error("expected a node test"));
            }
        };

        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket, "']'")?;
        }
        Ok(predicates)
    }
}

//! Static typing of check expressions.
//!
//! Params are strings, so a check's types are known before any request
//! arrives. Expressions are parsed and every operator is checked against its
//! operand types:
//!
//! | operator                     | operands                       | result |
//! |------------------------------|--------------------------------|--------|
//! | `==` `!=`                    | same type (int/float mix)      | bool   |
//! | `<` `>` `<=` `>=`            | two strings or two numbers     | bool   |
//! | `and` `or` `not`             | bools                          | bool   |
//! | `in` `not in`                | string in string, `T` in `[T]` | bool   |
//! | `~`                          | scalars                        | string |
//! | `+` `-` `*` `/` `//` `%` `**`| numbers                        | number |
//!
//! Filters and tests come from a fixed table. The whole expression must be
//! a bool, so `host` alone or `host == 1` is rejected at compile time.
//! Operator precedence follows minijinja, which evaluates the expression.

use std::fmt;

use crate::template::CheckVariables;

/// Static type of a check sub-expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    String,
    Int,
    Float,
    Bool,
    None,
    List(Box<Type>),
    /// Element type of an empty list literal.
    Unknown,
}

impl Type {
    fn is_number(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Unknown)
    }

    fn is_scalar(&self) -> bool {
        matches!(self, Type::String | Type::Int | Type::Float | Type::Bool | Type::Unknown)
    }

    fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (a, b) if a.is_number() && b.is_number() => true,
            (Type::List(a), Type::List(b)) => a.compatible(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => f.write_str("string"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::Bool => f.write_str("bool"),
            Type::None => f.write_str("none"),
            Type::List(inner) => write!(f, "list({inner})"),
            Type::Unknown => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str,
    Int,
    Float,
    Op(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Str => f.write_str("string literal"),
            Token::Int | Token::Float => f.write_str("number literal"),
            Token::Op(op) => write!(f, "'{op}'"),
        }
    }
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "//", "**", "<", ">", "+", "-", "*", "/", "%", "~", "|", "(", ")",
    "[", "]", ",",
];

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '"' || c == '\'' {
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err("unterminated string literal".to_string()),
                    Some('\\') => i += 2,
                    Some(&q) if q == c => break,
                    Some(_) => i += 1,
                }
            }
            i += 1;
            tokens.push(Token::Str);
        } else if c.is_ascii_digit() {
            let mut float = false;
            while let Some(&d) = chars.get(i) {
                if d.is_ascii_digit() || d == '_' {
                    i += 1;
                } else if d == '.' && !float && chars.get(i + 1).is_some_and(char::is_ascii_digit) {
                    float = true;
                    i += 1;
                } else if (d == 'e' || d == 'E') && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+') {
                    float = true;
                    i += 2;
                } else {
                    break;
                }
            }
            tokens.push(if float { Token::Float } else { Token::Int });
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while chars.get(i).is_some_and(|d| d.is_alphanumeric() || *d == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| format!("unexpected character '{c}'"))?;
            i += op.len();
            tokens.push(Token::Op(*op));
        }
    }

    Ok(tokens)
}

/// Recursive-descent type checker; parses and types in one pass.
struct Checker<'a> {
    tokens: Vec<Token>,
    pos: usize,
    variables: &'a CheckVariables,
}

type Typed = Result<Type, String>;

impl<'a> Checker<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == name)
    }

    fn peek_ident_at(&self, offset: usize, name: &str) -> bool {
        matches!(self.tokens.get(self.pos + offset), Some(Token::Ident(i)) if i == name)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect_op(&mut self, op: &str) -> Result<(), String> {
        match self.next() {
            Some(Token::Op(o)) if o == op => Ok(()),
            Some(other) => Err(format!("expected '{op}', found {other}")),
            None => Err(format!("expected '{op}', found end of expression")),
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            Some(other) => Err(format!("expected a name, found {other}")),
            None => Err("expected a name, found end of expression".to_string()),
        }
    }

    fn or(&mut self) -> Typed {
        let mut left = self.and()?;
        while self.peek_ident("or") {
            self.pos += 1;
            let right = self.and()?;
            left = logical("or", left, right)?;
        }
        Ok(left)
    }

    fn and(&mut self) -> Typed {
        let mut left = self.not()?;
        while self.peek_ident("and") {
            self.pos += 1;
            let right = self.not()?;
            left = logical("and", left, right)?;
        }
        Ok(left)
    }

    fn not(&mut self) -> Typed {
        if self.peek_ident("not") {
            self.pos += 1;
            let operand = self.not()?;
            if operand != Type::Bool {
                return Err(format!("no matching overload for 'not' on {operand}"));
            }
            return Ok(Type::Bool);
        }
        self.compare()
    }

    fn compare(&mut self) -> Typed {
        let mut left = self.math1()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) if matches!(*op, "==" | "!=" | "<" | ">" | "<=" | ">=") => *op,
                Some(Token::Ident(i)) if i == "in" => "in",
                Some(Token::Ident(i)) if i == "not" && self.peek_ident_at(1, "in") => "not in",
                _ => return Ok(left),
            };
            self.pos += if op == "not in" { 2 } else { 1 };
            let right = self.math1()?;
            left = comparison(op, left, right)?;
        }
    }

    fn math1(&mut self) -> Typed {
        let mut left = self.concat()?;
        while let Some(op) = ["+", "-"].into_iter().find(|op| self.peek_op(op)) {
            self.pos += 1;
            let right = self.concat()?;
            left = arithmetic(op, left, right)?;
        }
        Ok(left)
    }

    fn concat(&mut self) -> Typed {
        let mut left = self.math2()?;
        while self.peek_op("~") {
            self.pos += 1;
            let right = self.math2()?;
            if !left.is_scalar() || !right.is_scalar() {
                return Err(format!("no matching overload for '~' on {left} and {right}"));
            }
            left = Type::String;
        }
        Ok(left)
    }

    fn math2(&mut self) -> Typed {
        let mut left = self.pow()?;
        while let Some(op) = ["*", "//", "/", "%"].into_iter().find(|op| self.peek_op(op)) {
            self.pos += 1;
            let right = self.pow()?;
            left = arithmetic(op, left, right)?;
        }
        Ok(left)
    }

    fn pow(&mut self) -> Typed {
        let mut left = self.unary()?;
        while self.peek_op("**") {
            self.pos += 1;
            let right = self.unary()?;
            left = arithmetic("**", left, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Typed {
        if self.peek_op("-") {
            self.pos += 1;
            let operand = self.unary()?;
            if !operand.is_number() {
                return Err(format!("no matching overload for unary '-' on {operand}"));
            }
            return Ok(operand);
        }
        let mut ty = self.primary()?;
        loop {
            if self.peek_op("|") {
                self.pos += 1;
                let name = self.ident()?;
                self.no_arguments(&name)?;
                ty = filter(&name, ty)?;
            } else if self.peek_ident("is") {
                self.pos += 1;
                if self.peek_ident("not") {
                    self.pos += 1;
                }
                let name = self.ident()?;
                let args = self.arguments()?;
                ty = test(&name, ty, &args)?;
            } else {
                return Ok(ty);
            }
        }
    }

    fn no_arguments(&self, filter: &str) -> Result<(), String> {
        if self.peek_op("(") {
            return Err(format!("filter '{filter}' takes no arguments"));
        }
        Ok(())
    }

    fn arguments(&mut self) -> Result<Vec<Type>, String> {
        let mut args = Vec::new();
        if !self.peek_op("(") {
            return Ok(args);
        }
        self.pos += 1;
        while !self.peek_op(")") {
            args.push(self.or()?);
            if !self.peek_op(")") {
                self.expect_op(",")?;
            }
        }
        self.pos += 1;
        Ok(args)
    }

    fn primary(&mut self) -> Typed {
        match self.next() {
            Some(Token::Str) => Ok(Type::String),
            Some(Token::Int) => Ok(Type::Int),
            Some(Token::Float) => Ok(Type::Float),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" | "false" | "True" | "False" => Ok(Type::Bool),
                "none" | "None" => Ok(Type::None),
                _ if self.peek_op("(") => Err(format!("unknown function '{name}'")),
                _ if self.variables.contains(&name) => Ok(Type::String),
                _ => Err(format!("undeclared reference to '{name}'")),
            },
            Some(Token::Op("(")) => {
                let ty = self.or()?;
                self.expect_op(")")?;
                Ok(ty)
            }
            Some(Token::Op("[")) => {
                let mut element = Type::Unknown;
                while !self.peek_op("]") {
                    let item = self.or()?;
                    if !element.compatible(&item) {
                        return Err(format!("list mixes {element} and {item}"));
                    }
                    if element == Type::Unknown {
                        element = item;
                    }
                    if !self.peek_op("]") {
                        self.expect_op(",")?;
                    }
                }
                self.pos += 1;
                Ok(Type::List(Box::new(element)))
            }
            Some(other) => Err(format!("unexpected {other}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn logical(op: &str, left: Type, right: Type) -> Typed {
    if left != Type::Bool || right != Type::Bool {
        return Err(format!("no matching overload for '{op}' on {left} and {right}"));
    }
    Ok(Type::Bool)
}

fn comparison(op: &str, left: Type, right: Type) -> Typed {
    let ok = match op {
        "==" | "!=" => left.compatible(&right),
        "in" | "not in" => match &right {
            Type::String => left == Type::String,
            Type::List(element) => element.compatible(&left),
            _ => false,
        },
        _ => {
            left.compatible(&right) && (left.is_number() || left == Type::String)
                && (right.is_number() || right == Type::String)
        }
    };
    if !ok {
        return Err(format!("no matching overload for '{op}' on {left} and {right}"));
    }
    Ok(Type::Bool)
}

fn arithmetic(op: &str, left: Type, right: Type) -> Typed {
    if !left.is_number() || !right.is_number() {
        return Err(format!("no matching overload for '{op}' on {left} and {right}"));
    }
    if op == "/" || left == Type::Float || right == Type::Float {
        Ok(Type::Float)
    } else {
        Ok(Type::Int)
    }
}

fn filter(name: &str, input: Type) -> Typed {
    let result = match name {
        "length" | "count" if matches!(input, Type::String | Type::List(_)) => Type::Int,
        "int" if input.is_scalar() => Type::Int,
        "float" if input.is_scalar() => Type::Float,
        "string" => Type::String,
        "lower" | "upper" | "trim" | "title" | "capitalize" | "urlencode"
            if input == Type::String =>
        {
            Type::String
        }
        "abs" if input.is_number() => input,
        "length" | "count" | "int" | "float" | "lower" | "upper" | "trim" | "title"
        | "capitalize" | "urlencode" | "abs" => {
            return Err(format!("no matching overload for filter '{name}' on {input}"));
        }
        _ => return Err(format!("unknown filter '{name}'")),
    };
    Ok(result)
}

fn test(name: &str, input: Type, args: &[Type]) -> Typed {
    let ok = match name {
        "defined" | "undefined" | "none" | "number" | "string" => args.is_empty(),
        "lower" | "upper" => args.is_empty() && input == Type::String,
        "startingwith" | "endingwith" => {
            input == Type::String && args == [Type::String]
        }
        _ => return Err(format!("unknown test '{name}'")),
    };
    if !ok {
        return Err(format!("no matching overload for test '{name}' on {input}"));
    }
    Ok(Type::Bool)
}

/// Type a check expression over string `variables`; it must yield a bool.
pub fn check_expression(source: &str, variables: &CheckVariables) -> Result<(), String> {
    let mut checker = Checker {
        tokens: tokenize(source)?,
        pos: 0,
        variables,
    };
    let ty = checker.or()?;
    if let Some(token) = checker.peek() {
        return Err(format!("unexpected {token}"));
    }
    if ty != Type::Bool {
        return Err(format!("check must evaluate to bool, found {ty}"));
    }
    Ok(())
}

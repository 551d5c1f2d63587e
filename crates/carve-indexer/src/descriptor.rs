//! Field/method descriptors and generic signatures
//!
//! Both walkers report internal class names (`com/example/Foo`) through a
//! callback. Primitive and `void` types are never reported.

use crate::error::{ClassFileError, Result};

/// Deepest type-argument or annotation nesting accepted before the
/// artifact is rejected.
pub const MAX_NESTING: usize = 64;

/// Report every object type in a field or method descriptor.
///
/// An array type reports its element type once, whatever its dimension.
pub fn visit_descriptor(descriptor: &str, mut visit: impl FnMut(&str)) -> Result<()> {
    let bytes = descriptor.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' | b'[' | b'(' | b')' => i += 1,
            b'L' => {
                let end = descriptor[i..]
                    .find(';')
                    .map(|offset| i + offset)
                    .ok_or_else(|| ClassFileError::BadDescriptor(descriptor.to_string()))?;
                if end == i + 1 {
                    return Err(ClassFileError::BadDescriptor(descriptor.to_string()));
                }
                visit(&descriptor[i + 1..end]);
                i = end + 1;
            }
            _ => return Err(ClassFileError::BadDescriptor(descriptor.to_string())),
        }
    }
    Ok(())
}

/// Which grammar a `Signature` attribute follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Class,
    Method,
    Field,
}

/// Report the class types a generic signature adds on top of its erased
/// descriptor: type arguments at any depth and type-parameter bounds.
///
/// The outermost types (superclass, parameter, return, field and thrown
/// types) are not reported; the class header, descriptor and `Exceptions`
/// attribute already name them.
pub fn visit_signature(signature: &str, kind: SignatureKind, mut visit: impl FnMut(&str)) -> Result<()> {
    let mut parser = SignatureParser {
        text: signature,
        pos: 0,
        visit: &mut visit,
    };
    match kind {
        SignatureKind::Class => parser.class_signature()?,
        SignatureKind::Method => parser.method_signature()?,
        SignatureKind::Field => parser.reference_type(false, 0)?,
    }
    if parser.pos != signature.len() {
        return Err(parser.error());
    }
    Ok(())
}

struct SignatureParser<'a, 'v> {
    text: &'a str,
    pos: usize,
    visit: &'v mut dyn FnMut(&str),
}

impl<'a> SignatureParser<'a, '_> {
    fn error(&self) -> ClassFileError {
        ClassFileError::BadSignature(self.text.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Read up to (not including) the first of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start || self.peek().is_none() {
            return Err(self.error());
        }
        Ok(&self.text[start..self.pos])
    }

    fn class_signature(&mut self) -> Result<()> {
        self.type_parameters()?;
        // Superclass, then interfaces
        while self.peek().is_some() {
            self.class_type(false, 0)?;
        }
        Ok(())
    }

    fn method_signature(&mut self) -> Result<()> {
        self.type_parameters()?;
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            self.java_type(false, 0)?;
        }
        self.expect(b')')?;
        if self.peek() == Some(b'V') {
            self.pos += 1;
        } else {
            self.java_type(false, 0)?;
        }
        while self.peek() == Some(b'^') {
            self.pos += 1;
            self.reference_type(false, 0)?;
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<()> {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.pos += 1;
        while self.peek() != Some(b'>') {
            self.identifier(b":>")?;
            // Class bound (may be empty), then interface bounds
            self.expect(b':')?;
            if !matches!(self.peek(), Some(b':') | Some(b'>')) {
                self.reference_type(true, 1)?;
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.reference_type(true, 1)?;
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self, report: bool, depth: usize) -> Result<()> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                Ok(())
            }
            _ => self.reference_type(report, depth),
        }
    }

    fn reference_type(&mut self, report: bool, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(ClassFileError::NestingTooDeep { limit: MAX_NESTING });
        }
        match self.peek() {
            Some(b'L') => self.class_type(report, depth),
            Some(b'T') => {
                self.pos += 1;
                self.identifier(b";")?;
                self.expect(b';')
            }
            Some(b'[') => {
                self.pos += 1;
                self.java_type(report, depth + 1)
            }
            _ => Err(self.error()),
        }
    }

    /// `L pkg/Outer <args> . Inner <args> ;`
    fn class_type(&mut self, report: bool, depth: usize) -> Result<()> {
        self.expect(b'L')?;
        let mut name = self.identifier(b"<.;")?.to_string();
        self.type_arguments(depth)?;
        while self.peek() == Some(b'.') {
            self.pos += 1;
            name.push('$');
            name.push_str(self.identifier(b"<.;")?);
            self.type_arguments(depth)?;
        }
        self.expect(b';')?;
        if report {
            (self.visit)(&name);
        }
        Ok(())
    }

    fn type_arguments(&mut self, depth: usize) -> Result<()> {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.pos += 1;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.reference_type(true, depth + 1)?;
                }
                Some(_) => self.reference_type(true, depth + 1)?,
                None => return Err(self.error()),
            }
        }
        self.expect(b'>')
    }
}

//! Class file parsing through krakatau2
//!
//! `parse_class` turns one artifact into krakatau2's parsed class and
//! never panics: a parser panic on hostile input becomes an error value.
//! `ConstantNames` resolves the constant pool indices the reference fold
//! needs into owned strings.

use std::panic;

use krakatau2::lib::classfile::attrs::AttrBody;
use krakatau2::lib::classfile::parse::Class;
use krakatau2::lib::disassemble::refprinter::{ConstData, RefPrinter, SingleTag};
use krakatau2::lib::{classfile, ParserOptions};

use crate::error::{ClassFileError, Result};

pub const MAGIC: u32 = 0xCAFE_BABE;
pub const ACC_INTERFACE: u16 = 0x0200;

const PARSER_OPTIONS: ParserOptions = ParserOptions { no_short_code_attr: true };

/// Parse one class artifact.
pub fn parse_class(bytes: &[u8]) -> Result<Class<'_>> {
    let Some(header) = bytes.get(..4) else {
        return Err(ClassFileError::Malformed);
    };
    let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }

    match panic::catch_unwind(|| classfile::parse(bytes, PARSER_OPTIONS)) {
        Ok(Ok(class)) => Ok(class),
        Ok(Err(_)) => Err(ClassFileError::Malformed),
        Err(_) => Err(ClassFileError::ParserPanic),
    }
}

pub fn is_interface(class: &Class<'_>) -> bool {
    class.access & ACC_INTERFACE != 0
}

/// Constant pool lookups by index, each checked against the expected kind.
pub struct ConstantNames<'a> {
    printer: RefPrinter<'a>,
}

impl<'a> ConstantNames<'a> {
    pub fn new(class: &'a Class<'a>) -> Self {
        let mut bootstrap = None;
        let mut inner_classes = None;
        for attr in &class.attrs {
            match &attr.body {
                AttrBody::BootstrapMethods(v) => bootstrap = Some(v.as_ref()),
                AttrBody::InnerClasses(v) => inner_classes = Some(v.as_ref()),
                _ => {}
            }
        }
        ConstantNames {
            printer: RefPrinter::new(true, &class.cp, bootstrap, inner_classes),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        match self.printer.cpool.get(index as usize).map(|line| &line.data) {
            Some(ConstData::Utf8(text)) => Ok(text.s.to_string()),
            _ => Err(bad_index(index, "Utf8")),
        }
    }

    /// Internal name (or array descriptor) of a `Class` constant.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.printer.cpool.get(index as usize).map(|line| &line.data) {
            Some(ConstData::Single(SingleTag::Class, name)) => self.utf8(*name),
            _ => Err(bad_index(index, "Class")),
        }
    }

    /// Like [`ConstantNames::class_name`], but index 0 means "absent".
    pub fn optional_class_name(&self, index: u16) -> Result<Option<String>> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    /// `ldc` operands: the class name when the constant is a class literal.
    pub fn loaded_class(&self, index: u16) -> Result<Option<String>> {
        match self.printer.cpool.get(index as usize).map(|line| &line.data) {
            Some(ConstData::Single(SingleTag::Class, name)) => self.utf8(*name).map(Some),
            Some(_) => Ok(None),
            None => Err(bad_index(index, "loadable constant")),
        }
    }

    /// Owner class and descriptor of a field or method reference.
    pub fn member_ref(&self, index: u16) -> Result<(String, String)> {
        let entry = self.printer.cpool.get(index as usize).map(|line| &line.data);
        let Some(ConstData::Fmim(_, owner, name_and_type)) = entry else {
            return Err(bad_index(index, "member reference"));
        };
        let owner = self.class_name(*owner)?;
        Ok((owner, self.descriptor_of(*name_and_type)?))
    }

    /// Call-site descriptor of an `invokedynamic` constant.
    pub fn dynamic_descriptor(&self, index: u16) -> Result<String> {
        match self.printer.cpool.get(index as usize).map(|line| &line.data) {
            Some(ConstData::Dyn(_, _, name_and_type)) => self.descriptor_of(*name_and_type),
            _ => Err(bad_index(index, "InvokeDynamic")),
        }
    }

    fn descriptor_of(&self, name_and_type: u16) -> Result<String> {
        match self.printer.cpool.get(name_and_type as usize).map(|line| &line.data) {
            Some(ConstData::Nat(_, descriptor)) => self.utf8(*descriptor),
            _ => Err(bad_index(name_and_type, "NameAndType")),
        }
    }
}

fn bad_index(index: u16, expected: &'static str) -> ClassFileError {
    ClassFileError::BadConstantIndex { index, expected }
}

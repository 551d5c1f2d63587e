//! Reference collection over a parsed class file

use std::collections::BTreeMap;
use std::sync::LazyLock;

use krakatau2::lib::classfile::attrs::{AttrBody, Annotation, Attribute, ElementValue};
use krakatau2::lib::classfile::code::Instr;
use krakatau2::lib::classfile::parse::Class;
use regex::Regex;

use crate::classfile::{is_interface, parse_class, ConstantNames};
use crate::descriptor::{visit_descriptor, visit_signature, SignatureKind, MAX_NESTING};
use crate::error::{ClassFileError, Result};
use crate::scope::canonical_name;

/// Object type descriptors embedded in annotation string values,
/// e.g. `@Named("Lcom/example/Hidden;")`.
static EMBEDDED_DESCRIPTOR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"L\w[\w/$]+;").ok());

/// What one class artifact references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReferences {
    /// Canonical name of the class this artifact declares.
    pub name: String,
    /// Whether the artifact declares a nested class (its internal name has a `$`).
    pub is_nested: bool,
    pub is_interface: bool,
    /// Canonical referenced class name to number of reference sites.
    pub references: BTreeMap<String, u32>,
}

/// Parse one class artifact and collect every class it references.
pub fn extract_references(bytes: &[u8]) -> Result<ClassReferences> {
    let class = parse_class(bytes)?;
    collect_references(&class)
}

/// Fold the reference collector over a parsed class.
pub fn collect_references(class: &Class<'_>) -> Result<ClassReferences> {
    let names = ConstantNames::new(class);
    let this_class = names.class_name(class.this)?;
    let mut collector = ReferenceCollector {
        names: &names,
        counts: BTreeMap::new(),
    };

    if let Some(super_class) = names.optional_class_name(class.super_)? {
        collector.class_operand(&super_class)?;
    }
    for interface in &class.interfaces {
        collector.class_operand(&names.class_name(*interface)?)?;
    }
    collector.attributes(&class.attrs, SignatureKind::Class)?;

    for field in &class.fields {
        collector.member(field.desc, &field.attrs, SignatureKind::Field)?;
    }
    for method in &class.methods {
        collector.member(method.desc, &method.attrs, SignatureKind::Method)?;
    }

    Ok(ClassReferences {
        name: canonical_name(&this_class),
        is_nested: this_class.contains('$'),
        is_interface: is_interface(class),
        references: collector.counts,
    })
}

struct ReferenceCollector<'n, 'a> {
    names: &'n ConstantNames<'a>,
    counts: BTreeMap<String, u32>,
}

impl ReferenceCollector<'_, '_> {
    fn count(&mut self, internal: &str) {
        let name = canonical_name(internal);
        if !name.is_empty() {
            *self.counts.entry(name).or_insert(0) += 1;
        }
    }

    fn descriptor(&mut self, descriptor: &str) -> Result<()> {
        visit_descriptor(descriptor, |name| self.count(name))
    }

    fn descriptor_at(&mut self, index: u16) -> Result<()> {
        let descriptor = self.names.utf8(index)?;
        self.descriptor(&descriptor)
    }

    fn signature(&mut self, signature: &str, kind: SignatureKind) -> Result<()> {
        visit_signature(signature, kind, |name| self.count(name))
    }

    /// A `Class` constant: an internal name, or a descriptor for array types.
    fn class_operand(&mut self, class: &str) -> Result<()> {
        if class.starts_with('[') {
            self.descriptor(class)
        } else {
            self.count(class);
            Ok(())
        }
    }

    fn class_at(&mut self, index: u16) -> Result<()> {
        let class = self.names.class_name(index)?;
        self.class_operand(&class)
    }

    fn member(&mut self, descriptor: u16, attributes: &[Attribute<'_>], kind: SignatureKind) -> Result<()> {
        self.descriptor_at(descriptor)?;
        self.attributes(attributes, kind)
    }

    fn attributes(&mut self, attributes: &[Attribute<'_>], kind: SignatureKind) -> Result<()> {
        for attribute in attributes {
            match &attribute.body {
                AttrBody::Signature(index) => {
                    let signature = self.names.utf8(*index)?;
                    self.signature(&signature, kind)?;
                }
                AttrBody::Exceptions(exceptions) => {
                    for exception in exceptions {
                        self.class_at(*exception)?;
                    }
                }
                AttrBody::RuntimeVisibleAnnotations(annotations)
                | AttrBody::RuntimeInvisibleAnnotations(annotations) => {
                    for annotation in annotations {
                        self.annotation(annotation, 0)?;
                    }
                }
                AttrBody::RuntimeVisibleParameterAnnotations(parameters)
                | AttrBody::RuntimeInvisibleParameterAnnotations(parameters) => {
                    for parameter in parameters {
                        for annotation in &parameter.0 {
                            self.annotation(annotation, 0)?;
                        }
                    }
                }
                AttrBody::RuntimeVisibleTypeAnnotations(annotations)
                | AttrBody::RuntimeInvisibleTypeAnnotations(annotations) => {
                    for type_annotation in annotations {
                        self.annotation(&type_annotation.anno, 0)?;
                    }
                }
                AttrBody::AnnotationDefault(value) => self.element(value, 0)?,
                AttrBody::Code((code, _)) => {
                    for (_, instr) in &code.bytecode.0 {
                        self.instruction(instr)?;
                    }
                    for handler in &code.exceptions {
                        // 0 marks a `finally` handler
                        if handler.ctype != 0 {
                            self.class_at(handler.ctype)?;
                        }
                    }
                    self.attributes(&code.attrs, SignatureKind::Method)?;
                }
                AttrBody::LocalVariableTable(variables) => {
                    for variable in variables {
                        self.descriptor_at(variable.desc)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn annotation(&mut self, annotation: &Annotation, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(ClassFileError::NestingTooDeep { limit: MAX_NESTING });
        }
        self.descriptor_at(annotation.0)?;
        for (_, value) in &annotation.1 {
            self.element(value, depth + 1)?;
        }
        Ok(())
    }

    fn element(&mut self, value: &ElementValue, depth: usize) -> Result<()> {
        if depth > MAX_NESTING {
            return Err(ClassFileError::NestingTooDeep { limit: MAX_NESTING });
        }
        match value {
            ElementValue::Str(index) => {
                let text = self.names.utf8(*index)?;
                self.embedded_descriptors(&text)
            }
            ElementValue::Enum(type_descriptor, _) => self.descriptor_at(*type_descriptor),
            ElementValue::Class(descriptor) => self.descriptor_at(*descriptor),
            ElementValue::Anno(annotation) => self.annotation(annotation, depth + 1),
            ElementValue::Array(values) => values.iter().try_for_each(|v| self.element(v, depth + 1)),
            _ => Ok(()),
        }
    }

    fn embedded_descriptors(&mut self, text: &str) -> Result<()> {
        let Some(pattern) = EMBEDDED_DESCRIPTOR.as_ref() else {
            return Ok(());
        };
        for found in pattern.find_iter(text) {
            self.descriptor(found.as_str())?;
        }
        Ok(())
    }

    fn instruction(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::New(index)
            | Instr::Anewarray(index)
            | Instr::Checkcast(index)
            | Instr::Instanceof(index)
            | Instr::Multianewarray(index, ..) => self.class_at(*index),
            Instr::Ldc(index) => self.loaded_class(*index as u16),
            Instr::LdcW(index) => self.loaded_class(*index),
            Instr::Getstatic(index)
            | Instr::Putstatic(index)
            | Instr::Getfield(index)
            | Instr::Putfield(index)
            | Instr::Invokevirtual(index)
            | Instr::Invokespecial(index)
            | Instr::Invokestatic(index)
            | Instr::Invokeinterface(index, ..) => {
                let (owner, descriptor) = self.names.member_ref(*index)?;
                self.class_operand(&owner)?;
                self.descriptor(&descriptor)
            }
            Instr::Invokedynamic(index) => {
                let descriptor = self.names.dynamic_descriptor(*index)?;
                self.descriptor(&descriptor)
            }
            _ => Ok(()),
        }
    }

    fn loaded_class(&mut self, index: u16) -> Result<()> {
        match self.names.loaded_class(index)? {
            Some(class) => self.class_operand(&class),
            None => Ok(()),
        }
    }
}

//! Assignment, cast and operator compatibility.

use super::TypeSystem;
use crate::error::{CompileError, Result};
use crate::location::{SourceLocation, describe};
use crate::symbol::SymbolId;
use crate::types::tables::{self, Table};
use crate::types::{BuiltIn, Type};

/// An expression as the checker sees it: its evaluated type and where it is.
#[derive(Debug, Clone)]
pub struct TypedNode {
    pub eval_type: Type,
    pub location: Option<SourceLocation>,
}

impl TypedNode {
    pub fn new(eval_type: Type, location: Option<SourceLocation>) -> Self {
        Self { eval_type, location }
    }

    pub fn at(&self) -> String {
        describe(self.location.as_ref(), "expr")
    }
}

impl TypeSystem {
    /// Implicit widening of `src` to `dst`, if any.
    pub fn promote(&self, src: &Type, dst: &Type) -> Option<Type> {
        tables::lookup(tables::PROMOTE_FROM_TO, src, dst)
    }

    /// Whether a value of `src` may be stored where `dst` is expected.
    pub fn can_assign_to(&self, src: &Type, dst: &Type, promotion: Option<&Type>) -> bool {
        src == dst
            || promotion == Some(dst)
            || dst.is(BuiltIn::Any)
            || ((dst.is_class() || dst.is_func()) && src.is(BuiltIn::Null))
            || self.same_name(src, dst)
            || self.is_child_class(src, dst)
    }

    fn same_name(&self, a: &Type, b: &Type) -> bool {
        match (self.type_name(a), self.type_name(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_child_class(&self, t: &Type, parent: &Type) -> bool {
        match (t.as_class(), parent.as_class()) {
            (Some(c), Some(p)) => self.is_subclass_of(c, p),
            _ => false,
        }
    }

    pub fn is_in_same_class_hierarchy(&self, a: &Type, b: &Type) -> bool {
        self.is_child_class(a, b) || self.is_child_class(b, a)
    }

    fn assignable(&self, src: &Type, dst: &Type) -> bool {
        let promotion = self.promote(src, dst);
        self.can_assign_to(src, dst, promotion.as_ref())
    }

    pub fn check_assign(&self, lhs: &TypedNode, rhs: &TypedNode) -> Result<()> {
        if self.assignable(&rhs.eval_type, &lhs.eval_type) {
            return Ok(());
        }
        Err(self.incompatible(lhs.at(), &lhs.eval_type, &rhs.eval_type))
    }

    /// Checks `rhs` against a declared type, e.g. an argument or default value.
    pub fn check_assign_to_type(&self, lhs: &Type, rhs: &TypedNode) -> Result<()> {
        if self.assignable(&rhs.eval_type, lhs) {
            return Ok(());
        }
        Err(self.incompatible(rhs.at(), lhs, &rhs.eval_type))
    }

    pub fn check_assign_from_type(&self, lhs: &TypedNode, rhs: &Type) -> Result<()> {
        if self.assignable(rhs, &lhs.eval_type) {
            return Ok(());
        }
        Err(self.incompatible(lhs.at(), &lhs.eval_type, rhs))
    }

    fn incompatible(&self, at: String, lhs: &Type, rhs: &Type) -> CompileError {
        let lhs = self.type_name(lhs).unwrap_or_else(|_| "?".to_string());
        let rhs = self.type_name(rhs).unwrap_or_else(|_| "?".to_string());
        CompileError::incompatible(at, format!("incompatible types: '{lhs}' and '{rhs}'"))
    }

    /// Explicit cast of `exp` to the type named by `ty`.
    pub fn check_cast(&self, ty: &TypedNode, exp: &TypedNode) -> Result<()> {
        let (ltype, rtype) = (&ty.eval_type, &exp.eval_type);
        if ltype == rtype || ltype.is(BuiltIn::Any) || rtype.is(BuiltIn::Any) {
            return Ok(());
        }
        if (rtype.is_numeric() && ltype.is_enum()) || (ltype.is_numeric() && rtype.is_enum()) {
            return Ok(());
        }
        if (ltype.is(BuiltIn::String) && rtype.is_enum()) || (rtype.is(BuiltIn::String) && ltype.is_enum()) {
            return Ok(());
        }
        if tables::lookup(tables::CAST_FROM_TO, rtype, ltype).as_ref() == Some(ltype) {
            return Ok(());
        }
        if self.is_in_same_class_hierarchy(rtype, ltype) {
            return Ok(());
        }
        let (l, r) = (self.type_name(ltype)?, self.type_name(rtype)?);
        Err(CompileError::incompatible(
            ty.at(),
            format!("incompatible types for casting: '{r}' to '{l}'"),
        ))
    }

    fn match_types(&self, table: Table, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        tables::lookup(table, &a.eval_type, &b.eval_type)
            .ok_or_else(|| self.incompatible(a.at(), &a.eval_type, &b.eval_type))
    }

    fn require_operand(&self, node: &TypedNode, ok: bool, what: &str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(CompileError::incompatible(node.at(), what.to_string()))
        }
    }

    pub fn check_bin_op(&self, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        for node in [a, b] {
            let t = &node.eval_type;
            let ok = t.is(BuiltIn::Bool) || t.is(BuiltIn::String) || t.is_numeric();
            self.require_operand(node, ok, "operator is not overloaded")?;
        }
        self.match_types(tables::BIN_OP_RESULT, a, b)
    }

    /// Binary operator resolved to the overload `op_func` of `a`'s class.
    pub fn check_bin_op_overload(&self, _a: &TypedNode, b: &TypedNode, op_func: SymbolId) -> Result<Type> {
        let arg = self.get_arg(op_func, 0)?;
        let arg_type = self.symbol_type(arg)?;
        self.check_assign_to_type(&arg_type, b)?;
        self.return_type(op_func)
    }

    pub fn check_rtl_bin_op(&self, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        for node in [a, b] {
            let t = &node.eval_type;
            self.require_operand(node, t.is_numeric() || t.is(BuiltIn::String), "operator is not overloaded")?;
        }
        self.match_types(tables::RTL_OP_RESULT, a, b)?;
        Ok(Type::BOOL)
    }

    pub fn check_eq_bin_op(&self, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        let (at, bt) = (&a.eval_type, &b.eval_type);
        if at == bt || (at.is_class() && bt.is_class()) {
            return Ok(Type::BOOL);
        }
        let nullable = |t: &Type| t.is_class() || t.is_func();
        if (nullable(at) && bt.is(BuiltIn::Null)) || (nullable(bt) && at.is(BuiltIn::Null)) {
            return Ok(Type::BOOL);
        }
        self.match_types(tables::EQ_OP_RESULT, a, b)?;
        Ok(Type::BOOL)
    }

    pub fn check_unary_minus(&self, a: &TypedNode) -> Result<Type> {
        self.require_operand(a, a.eval_type.is_numeric(), "must be numeric type")?;
        Ok(a.eval_type.clone())
    }

    pub fn check_bit_op(&self, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        for node in [a, b] {
            self.require_operand(node, node.eval_type.is(BuiltIn::Int), "must be int type")?;
        }
        Ok(Type::INT)
    }

    pub fn check_logical_op(&self, a: &TypedNode, b: &TypedNode) -> Result<Type> {
        for node in [a, b] {
            self.require_operand(node, node.eval_type.is(BuiltIn::Bool), "must be bool type")?;
        }
        Ok(Type::BOOL)
    }

    pub fn check_logical_not(&self, a: &TypedNode) -> Result<Type> {
        self.require_operand(a, a.eval_type.is(BuiltIn::Bool), "must be bool type")?;
        Ok(Type::BOOL)
    }
}

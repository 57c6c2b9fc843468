use std::sync::Arc;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::lexer::token::{Operator, Token, TokenKind};
use crate::range::Range;
use crate::registry::{Arity, ConstantRegistry, FunctionRegistry, fold_case};

use super::error::ParseError;
use super::node::{Args, BinaryOp, Expr, Operation};

#[derive(Debug)]
enum Pending {
    Operator(Operator, Range),
    Function(SmolStr, Range),
    LeftBracket(Range),
}

/// Builds an operation tree from a token list with the shunting-yard algorithm.
///
/// Identifiers resolve in order: function when followed by a call, constant from the
/// constant registry handed to the builder, otherwise variable.
pub struct AstBuilder<'a> {
    functions: &'a FunctionRegistry,
    constants: &'a ConstantRegistry,
    case_sensitive: bool,
    result_stack: Vec<Arc<Operation>>,
    operator_stack: Vec<Pending>,
    parameter_count: Vec<usize>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(functions: &'a FunctionRegistry, constants: &'a ConstantRegistry, case_sensitive: bool) -> Self {
        Self {
            functions,
            constants,
            case_sensitive,
            result_stack: Vec::new(),
            operator_stack: Vec::new(),
            parameter_count: Vec::new(),
        }
    }

    pub fn build(mut self, tokens: &[Token]) -> Result<Arc<Operation>, ParseError> {
        if tokens.is_empty() {
            return Err(ParseError::EmptyFormula);
        }

        for token in tokens {
            match &token.kind {
                TokenKind::Integer(n) => self.result_stack.push(Arc::new(Operation::integer(*n))),
                TokenKind::FloatingPoint(n) => self.result_stack.push(Arc::new(Operation::floating_point(*n))),
                TokenKind::Identifier(name) => self.push_identifier(name, token.range),
                TokenKind::LeftBracket => self.operator_stack.push(Pending::LeftBracket(token.range)),
                TokenKind::RightBracket => self.pop_until_left_bracket(token.range)?,
                TokenKind::ArgumentSeparator => {
                    self.pop_until_argument_start(token.range)?;
                    match self.parameter_count.last_mut() {
                        Some(count) => *count += 1,
                        None => return Err(ParseError::MisplacedArgumentSeparator(token.range)),
                    }
                }
                TokenKind::Operator(op) => self.push_operator(*op, token.range)?,
            }
        }

        self.drain()?;
        self.verify_result_stack()
    }

    fn push_identifier(&mut self, name: &SmolStr, range: Range) {
        if matches!(self.functions.is_function_name(name), Ok(true)) {
            self.operator_stack.push(Pending::Function(name.clone(), range));
            self.parameter_count.push(1);
        } else if let Ok(info) = self.constants.constant_info(name) {
            self.result_stack.push(Arc::new(Operation::floating_point(info.value)));
        } else {
            let name = if self.case_sensitive { name.clone() } else { fold_case(name) };
            self.result_stack.push(Arc::new(Operation::variable(name)));
        }
    }

    fn push_operator(&mut self, op: Operator, range: Range) -> Result<(), ParseError> {
        while let Some(top) = self.operator_stack.last() {
            match top {
                Pending::Function(..) => self.reduce_top()?,
                Pending::Operator(pending, _) => {
                    let (p1, p2) = (op.precedence(), pending.precedence());
                    if (op.is_left_associative() && p1 <= p2) || p1 < p2 {
                        self.reduce_top()?;
                    } else {
                        break;
                    }
                }
                Pending::LeftBracket(_) => break,
            }
        }

        self.operator_stack.push(Pending::Operator(op, range));
        Ok(())
    }

    fn pop_until_left_bracket(&mut self, right_bracket: Range) -> Result<(), ParseError> {
        self.reduce_until_left_bracket()?;

        match self.operator_stack.pop() {
            Some(Pending::LeftBracket(_)) => Ok(()),
            _ => Err(ParseError::UnmatchedRightBracket(right_bracket)),
        }
    }

    fn pop_until_argument_start(&mut self, separator: Range) -> Result<(), ParseError> {
        self.reduce_until_left_bracket()?;

        match self.operator_stack.last() {
            Some(Pending::LeftBracket(_)) => Ok(()),
            _ => Err(ParseError::MisplacedArgumentSeparator(separator)),
        }
    }

    fn drain(&mut self) -> Result<(), ParseError> {
        self.reduce_until_left_bracket()?;

        match self.operator_stack.last() {
            Some(Pending::LeftBracket(range)) => Err(ParseError::UnmatchedLeftBracket(*range)),
            _ => Ok(()),
        }
    }

    fn reduce_until_left_bracket(&mut self) -> Result<(), ParseError> {
        while let Some(top) = self.operator_stack.last() {
            if matches!(top, Pending::LeftBracket(_)) {
                break;
            }
            self.reduce_top()?;
        }

        Ok(())
    }

    fn reduce_top(&mut self) -> Result<(), ParseError> {
        match self.operator_stack.pop() {
            Some(Pending::Operator(op, range)) => self.reduce_operator(op, range),
            Some(Pending::Function(name, range)) => self.reduce_function(&name, range),
            Some(Pending::LeftBracket(range)) => Err(ParseError::UnmatchedLeftBracket(range)),
            None => Err(ParseError::InvalidSyntax),
        }
    }

    fn reduce_operator(&mut self, op: Operator, range: Range) -> Result<(), ParseError> {
        let mismatch = || ParseError::OperatorArgumentMismatch(op, range);

        let operation = match op {
            Operator::UnaryMinus => {
                let argument = self.result_stack.pop().ok_or_else(mismatch)?;
                Operation::unary_minus(argument)
            }
            _ => {
                let right = self.result_stack.pop().ok_or_else(mismatch)?;
                let left = self.result_stack.pop().ok_or_else(mismatch)?;
                Operation::binary(binary_op(op), left, right)
            }
        };

        self.result_stack.push(Arc::new(operation));
        Ok(())
    }

    fn reduce_function(&mut self, name: &SmolStr, range: Range) -> Result<(), ParseError> {
        let info = self
            .functions
            .function_info(name)
            .map_err(|_| ParseError::UnknownFunction(name.clone(), range))?;
        let accumulated = self.parameter_count.pop().unwrap_or_default();
        let count = match info.arity {
            Arity::Dynamic => accumulated,
            Arity::Fixed(n) => n,
        };

        if self.result_stack.len() < count {
            return Err(ParseError::FunctionArgumentMismatch(name.clone(), range));
        }

        let arguments: Args = self
            .result_stack
            .drain(self.result_stack.len() - count..)
            .collect::<SmallVec<_>>();
        self.result_stack
            .push(Arc::new(Operation::function(info.name.clone(), arguments, info.is_idempotent)));

        Ok(())
    }

    /// Anything left below the root means two operands were never joined by an operator.
    fn verify_result_stack(mut self) -> Result<Arc<Operation>, ParseError> {
        let root = self.result_stack.pop().ok_or(ParseError::InvalidSyntax)?;

        if let Some(stray) = self.result_stack.iter().rev().find(|op| op.is_constant()) {
            return Err(match stray.expr() {
                Expr::IntegerConstant(n) => ParseError::UnexpectedIntegerConstant(*n),
                Expr::FloatingPointConstant(n) => ParseError::UnexpectedFloatingPointConstant(n.to_string()),
                _ => ParseError::InvalidSyntax,
            });
        }

        if !self.result_stack.is_empty() {
            return Err(ParseError::InvalidSyntax);
        }

        Ok(root)
    }
}

fn binary_op(op: Operator) -> BinaryOp {
    match op {
        Operator::Add => BinaryOp::Addition,
        Operator::Subtract => BinaryOp::Subtraction,
        Operator::Multiply => BinaryOp::Multiplication,
        Operator::Divide => BinaryOp::Division,
        Operator::Modulo => BinaryOp::Modulo,
        Operator::Power => BinaryOp::Exponentiation,
        Operator::And => BinaryOp::And,
        Operator::Or => BinaryOp::Or,
        Operator::LessThan => BinaryOp::LessThan,
        Operator::LessOrEqualThan => BinaryOp::LessOrEqualThan,
        Operator::GreaterThan => BinaryOp::GreaterThan,
        Operator::GreaterOrEqualThan => BinaryOp::GreaterOrEqualThan,
        Operator::Equal => BinaryOp::Equal,
        Operator::NotEqual => BinaryOp::NotEqual,
        Operator::UnaryMinus => BinaryOp::Subtraction,
    }
}

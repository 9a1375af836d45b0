use std::collections::BTreeSet;
use std::fmt;

use crate::prereq::{AttrRef, Pattern, Prerequisite};
use crate::selection::Snapshot;
use crate::value::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`, numeric sum or text concatenation.
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
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
    /// `&&`, yields the left operand when it is falsy.
    And,
    /// `||`, yields the left operand when it is truthy.
    Or,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Built-in functions available to formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `Math.max`
    Max,
    /// `Math.min`
    Min,
    /// `Math.floor`
    Floor,
    /// `Math.ceil`
    Ceil,
    /// `Math.round`
    Round,
    /// `Math.abs`
    Abs,
}

impl Builtin {
    /// Resolve a dotted function name such as `Math.max`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Math.max" => Some(Builtin::Max),
            "Math.min" => Some(Builtin::Min),
            "Math.floor" => Some(Builtin::Floor),
            "Math.ceil" => Some(Builtin::Ceil),
            "Math.round" => Some(Builtin::Round),
            "Math.abs" => Some(Builtin::Abs),
            _ => None,
        }
    }

    /// The dotted function name.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Max => "Math.max",
            Builtin::Min => "Math.min",
            Builtin::Floor => "Math.floor",
            Builtin::Ceil => "Math.ceil",
            Builtin::Round => "Math.round",
            Builtin::Abs => "Math.abs",
        }
    }

    fn apply(self, args: &[f64]) -> Option<f64> {
        let first = args.first().copied();
        match self {
            Builtin::Max => args.iter().copied().reduce(f64::max),
            Builtin::Min => args.iter().copied().reduce(f64::min),
            // Math.round rounds halves toward positive infinity.
            Builtin::Round => first.map(|x| (x + 0.5).floor()),
            Builtin::Floor => first.map(f64::floor),
            Builtin::Ceil => first.map(f64::ceil),
            Builtin::Abs => first.map(f64::abs),
        }
    }
}

/// A formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A number or string literal. `true`/`false` become 1/0.
    Literal(Value),
    /// `source`, or any other attribute key read from the snapshot.
    Ident(String),
    /// `dict["key"]`, for keys that are not valid identifiers.
    Index(String),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A built-in function call.
    Call(Builtin, Vec<Expr>),
    /// `cond ? then : else`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// What a formula can see while it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Value of the edge's source attribute, if any.
    pub source: Option<&'a Value>,
    /// The computed snapshot so far.
    pub dict: &'a Snapshot,
}

impl<'a> Scope<'a> {
    /// Create a scope.
    pub fn new(source: Option<&'a Value>, dict: &'a Snapshot) -> Self {
        Self { source, dict }
    }
}

fn num(v: &Option<Value>) -> f64 {
    v.as_ref().and_then(Value::as_number).unwrap_or(0.0)
}

fn truthy(v: &Option<Value>) -> bool {
    v.as_ref().is_some_and(Value::is_truthy)
}

/// Compare two values: numerically when both are numeric, as text otherwise.
fn compare(a: &Option<Value>, b: &Option<Value>) -> Option<std::cmp::Ordering> {
    let an = a.as_ref().map_or(Some(0.0), Value::as_number);
    let bn = b.as_ref().map_or(Some(0.0), Value::as_number);
    match (an, bn) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => {
            let at = a.as_ref().map(ToString::to_string).unwrap_or_default();
            let bt = b.as_ref().map(ToString::to_string).unwrap_or_default();
            Some(at.cmp(&bt))
        }
    }
}

impl Expr {
    /// Shorthand for a binary node.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Evaluate against a scope. Absent means "contributes nothing".
    ///
    /// Missing attributes read as absent and count as 0 in arithmetic.
    /// Division or remainder by zero is absent.
    pub fn eval(&self, scope: &Scope<'_>) -> Option<Value> {
        match self {
            Expr::Literal(v) => Some(v.clone()),
            Expr::Ident(name) if name == "source" => scope.source.cloned(),
            Expr::Ident(name) | Expr::Index(name) => scope.dict.get(name).cloned(),
            Expr::Unary(UnaryOp::Neg, e) => Some(Value::Number(-num(&e.eval(scope)))),
            Expr::Unary(UnaryOp::Not, e) => Some(Value::from(!truthy(&e.eval(scope)))),
            Expr::Binary(op, l, r) => eval_binary(*op, l, r, scope),
            Expr::Call(f, args) => {
                let args: Vec<f64> = args.iter().map(|a| num(&a.eval(scope))).collect();
                f.apply(&args).map(Value::Number)
            }
            Expr::Conditional(c, t, e) => {
                if truthy(&c.eval(scope)) {
                    t.eval(scope)
                } else {
                    e.eval(scope)
                }
            }
        }
    }

    /// Attribute keys read by this expression, excluding `source`.
    pub fn references(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) if name == "source" => {}
            Expr::Ident(name) | Expr::Index(name) => {
                out.insert(name.clone());
            }
            Expr::Unary(_, e) => e.references(out),
            Expr::Binary(_, l, r) => {
                l.references(out);
                r.references(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.references(out)),
            Expr::Conditional(c, t, e) => {
                c.references(out);
                t.references(out);
                e.references(out);
            }
        }
    }
}

fn eval_binary(op: BinaryOp, l: &Expr, r: &Expr, scope: &Scope<'_>) -> Option<Value> {
    let lhs = l.eval(scope);
    match op {
        BinaryOp::And if !truthy(&lhs) => return Some(lhs.unwrap_or(Value::Number(0.0))),
        BinaryOp::Or if truthy(&lhs) => return lhs,
        BinaryOp::And | BinaryOp::Or => return r.eval(scope),
        _ => {}
    }
    let rhs = r.eval(scope);
    let ord = || compare(&lhs, &rhs);
    let (a, b) = (num(&lhs), num(&rhs));
    let out = match op {
        BinaryOp::Add => {
            let text = |v: &Option<Value>| matches!(v, Some(Value::Text(s)) if s.trim().parse::<f64>().is_err());
            if text(&lhs) || text(&rhs) {
                let mut s = lhs.as_ref().map(ToString::to_string).unwrap_or_default();
                s.push_str(&rhs.as_ref().map(ToString::to_string).unwrap_or_default());
                return Some(Value::Text(s));
            }
            Value::Number(a + b)
        }
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div if b == 0.0 => return None,
        BinaryOp::Div => Value::Number(a / b),
        BinaryOp::Rem if b == 0.0 => return None,
        BinaryOp::Rem => Value::Number(a % b),
        BinaryOp::Eq => Value::from(ord().is_some_and(|o| o.is_eq())),
        BinaryOp::Ne => Value::from(!ord().is_some_and(|o| o.is_eq())),
        BinaryOp::Lt => Value::from(ord().is_some_and(|o| o.is_lt())),
        BinaryOp::Le => Value::from(ord().is_some_and(|o| o.is_le())),
        BinaryOp::Gt => Value::from(ord().is_some_and(|o| o.is_gt())),
        BinaryOp::Ge => Value::from(ord().is_some_and(|o| o.is_ge())),
        BinaryOp::And | BinaryOp::Or => return None,
    };
    Some(out)
}

fn write_literal(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::Number(_) => write!(f, "{v}"),
        Value::Text(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write_literal(f, v),
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Index(key) => write!(f, "dict[\"{key}\"]"),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{e}"),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "!{e}"),
            Expr::Binary(op, l, r) => write!(f, "({l} {} {r})", op.symbol()),
            Expr::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Conditional(c, t, e) => write!(f, "({c} ? {t} : {e})"),
        }
    }
}

/// The formula carried by a rule edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// `null`: pass the source value through unchanged.
    PassThrough,
    /// A constant.
    Literal(Value),
    /// An expression with `source` and `dict` bound.
    Expr(Expr),
    /// 1 while the prerequisite is unmet by the snapshot, 0 once it holds.
    Unmet(Prerequisite),
}

impl Formula {
    /// Evaluate the formula. `None` means the edge contributes nothing.
    pub fn apply(&self, scope: &Scope<'_>) -> Option<Value> {
        match self {
            Formula::PassThrough => scope.source.cloned(),
            Formula::Literal(v) => Some(v.clone()),
            Formula::Expr(e) => e.eval(scope),
            Formula::Unmet(p) => Some(Value::from(!p.evaluate(scope.dict))),
        }
    }

    /// Keys and key patterns this formula reads from the snapshot.
    pub fn references(&self, idents: &mut BTreeSet<String>, patterns: &mut Vec<Pattern>) {
        match self {
            Formula::PassThrough | Formula::Literal(_) => {}
            Formula::Expr(e) => e.references(idents),
            Formula::Unmet(p) => {
                for cmp in p.clauses.iter().flat_map(|c| c.alternatives.iter()) {
                    match &cmp.attr {
                        AttrRef::Key(k) => {
                            idents.extend(crate::prereq::lookup_chain(k));
                        }
                        AttrRef::Sum(pat) | AttrRef::Max(pat) => patterns.push(pat.clone()),
                    }
                }
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::PassThrough => write!(f, "null"),
            Formula::Literal(v) => write_literal(f, v),
            Formula::Expr(e) => write!(f, "{e}"),
            Formula::Unmet(p) => write!(f, "unmet[{p}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: f64) -> Expr {
        Expr::Literal(Value::Number(n))
    }

    fn ident(s: &str) -> Expr {
        Expr::Ident(s.to_string())
    }

    fn die_formula() -> Expr {
        // Math.max(Math.min(2 + source * 2, 12), 4)
        Expr::Call(
            Builtin::Max,
            vec![
                Expr::Call(
                    Builtin::Min,
                    vec![
                        Expr::binary(
                            BinaryOp::Add,
                            lit(2.0),
                            Expr::binary(BinaryOp::Mul, ident("source"), lit(2.0)),
                        ),
                        lit(12.0),
                    ],
                ),
                lit(4.0),
            ],
        )
    }

    #[test]
    fn die_formula_clamps() {
        let dict = Snapshot::new();
        let cases = [(0.0, 4.0), (1.0, 4.0), (3.0, 8.0), (5.0, 12.0), (7.0, 12.0)];
        for (step, die) in cases {
            let source = Value::Number(step);
            let scope = Scope::new(Some(&source), &dict);
            assert_eq!(die_formula().eval(&scope), Some(Value::Number(die)), "step {step}");
        }
    }

    #[test]
    fn identifiers_read_the_snapshot() {
        let dict: Snapshot = [("strength", 8)].into_iter().collect();
        let scope = Scope::new(None, &dict);
        let e = Expr::binary(BinaryOp::Div, ident("strength"), lit(2.0));
        assert_eq!(e.eval(&scope), Some(Value::Number(4.0)));
        let missing = Expr::binary(BinaryOp::Add, ident("vigor"), lit(1.0));
        assert_eq!(missing.eval(&scope), Some(Value::Number(1.0)));
    }

    #[test]
    fn division_by_zero_is_absent() {
        let dict = Snapshot::new();
        let scope = Scope::new(None, &dict);
        assert_eq!(Expr::binary(BinaryOp::Div, lit(1.0), lit(0.0)).eval(&scope), None);
    }

    #[test]
    fn text_comparison_and_concatenation() {
        let dict: Snapshot = [("race", "Elf")].into_iter().collect();
        let scope = Scope::new(None, &dict);
        let eq = Expr::binary(BinaryOp::Eq, ident("race"), Expr::Literal("Elf".into()));
        assert_eq!(eq.eval(&scope), Some(Value::from(true)));
        let cat = Expr::binary(BinaryOp::Add, Expr::Literal("d".into()), lit(8.0));
        assert_eq!(cat.eval(&scope), Some(Value::from("d8")));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let dict = Snapshot::new();
        let scope = Scope::new(None, &dict);
        let or = Expr::binary(BinaryOp::Or, lit(0.0), lit(3.0));
        assert_eq!(or.eval(&scope), Some(Value::Number(3.0)));
        let and = Expr::binary(
            BinaryOp::And,
            lit(0.0),
            Expr::binary(BinaryOp::Div, lit(1.0), lit(0.0)),
        );
        assert_eq!(and.eval(&scope), Some(Value::Number(0.0)));
    }

    #[test]
    fn round_goes_half_up() {
        let dict = Snapshot::new();
        let scope = Scope::new(None, &dict);
        let r = |x| Expr::Call(Builtin::Round, vec![lit(x)]).eval(&scope);
        assert_eq!(r(2.5), Some(Value::Number(3.0)));
        assert_eq!(r(-2.5), Some(Value::Number(-2.0)));
    }

    #[test]
    fn references_skip_source() {
        let e = Expr::binary(
            BinaryOp::Add,
            ident("source"),
            Expr::binary(BinaryOp::Add, ident("strength"), Expr::Index("skills.Fighting".into())),
        );
        let mut refs = BTreeSet::new();
        e.references(&mut refs);
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), ["skills.Fighting", "strength"]);
    }

    #[test]
    fn display_is_fully_parenthesized() {
        assert_eq!(
            die_formula().to_string(),
            "Math.max(Math.min((2 + (source * 2)), 12), 4)"
        );
    }
}

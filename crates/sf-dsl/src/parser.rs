use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use sf_core::formula::{BinaryOp, Builtin, Expr, UnaryOp};
use sf_core::Value;

use crate::error::ParseError;
use crate::lexer::{self, Token};

type Span = SimpleSpan;

/// Build the formula parser.
///
/// Precedence, loosest first: `?:`, `||`, `&&`, equality, relational,
/// additive, multiplicative, unary, atoms.
fn formula_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let number = select! { Token::Number(n) => Expr::Literal(Value::Number(n)) }.labelled("number");
        let string = select! { Token::Str(s) => s }.labelled("string");
        let ident = select! { Token::Ident(s) => s }.labelled("identifier");
        let dict = select! { Token::Ident(ref s) if s.as_str() == "dict" => () };

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<Expr>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        // Once `name(` has matched the call is committed: an unknown name
        // is reported here instead of backtracking into a bare identifier.
        let call = ident
            .then(args)
            .validate(|(name, args), e, emitter| match Builtin::from_name(&name) {
                Some(f) => Expr::Call(f, args),
                None => {
                    emitter.emit(Rich::custom(e.span(), format!("unknown function: {name}")));
                    Expr::Ident(name)
                }
            });

        let index = dict
            .ignore_then(string.delimited_by(just(Token::LBracket), just(Token::RBracket)))
            .map(Expr::Index);

        let word = ident.map(|s| match s.as_str() {
            "true" => Expr::Literal(Value::from(true)),
            "false" => Expr::Literal(Value::from(false)),
            _ => Expr::Ident(s),
        });

        let atom = choice((
            number,
            string.map(|s| Expr::Literal(Value::Text(s))),
            call,
            index,
            word,
            expr.clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        ))
        .labelled("expression");

        let unary = choice((
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Bang).to(UnaryOp::Not),
        ))
        .repeated()
        .foldr(atom, |op, rhs| Expr::Unary(op, Box::new(rhs)))
        .boxed();

        let op = |t: Token, o: BinaryOp| just(t).to(o);
        let fold = |lhs: Expr, (o, rhs): (BinaryOp, Expr)| Expr::binary(o, lhs, rhs);

        let product = unary
            .clone()
            .foldl(
                choice((
                    op(Token::Star, BinaryOp::Mul),
                    op(Token::Slash, BinaryOp::Div),
                    op(Token::Percent, BinaryOp::Rem),
                ))
                .then(unary)
                .repeated(),
                fold,
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                choice((op(Token::Plus, BinaryOp::Add), op(Token::Minus, BinaryOp::Sub)))
                    .then(product)
                    .repeated(),
                fold,
            )
            .boxed();

        let relational = sum
            .clone()
            .foldl(
                choice((
                    op(Token::LtEq, BinaryOp::Le),
                    op(Token::GtEq, BinaryOp::Ge),
                    op(Token::Lt, BinaryOp::Lt),
                    op(Token::Gt, BinaryOp::Gt),
                ))
                .then(sum)
                .repeated(),
                fold,
            )
            .boxed();

        let equality = relational
            .clone()
            .foldl(
                choice((op(Token::EqEq, BinaryOp::Eq), op(Token::NotEq, BinaryOp::Ne)))
                    .then(relational)
                    .repeated(),
                fold,
            )
            .boxed();

        let and = equality
            .clone()
            .foldl(op(Token::AndAnd, BinaryOp::And).then(equality).repeated(), fold)
            .boxed();

        let or = and
            .clone()
            .foldl(op(Token::OrOr, BinaryOp::Or).then(and).repeated(), fold)
            .boxed();

        or.then(
            just(Token::Question)
                .ignore_then(expr.clone())
                .then_ignore(just(Token::Colon))
                .then(expr)
                .or_not(),
        )
        .map(|(cond, branches)| match branches {
            Some((then, otherwise)) => {
                Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise))
            }
            None => cond,
        })
    })
}

/// Parse formula text into an expression.
pub fn parse_formula(source: &str) -> Result<Expr, Vec<ParseError>> {
    let (tokens, lex_errors) = lexer::lex(source);
    if !lex_errors.is_empty() {
        return Err(lex_errors
            .into_iter()
            .map(|e| ParseError {
                span: e.span,
                message: e.message,
            })
            .collect());
    }

    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));
    let len = source.len();
    let eoi: Span = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = formula_parser().parse(stream).into_output_errors();
    match output {
        Some(expr) if errors.is_empty() => Ok(expr),
        _ => Err(errors
            .into_iter()
            .map(|e| ParseError {
                span: e.span().into_range(),
                message: e.to_string(),
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::{Scope, Snapshot};

    fn eval(source: &str, dict: &Snapshot, src: Option<f64>) -> Option<Value> {
        let expr = parse_formula(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
        let src = src.map(Value::Number);
        expr.eval(&Scope::new(src.as_ref(), dict))
    }

    #[test]
    fn die_formula_shape() {
        let expr = parse_formula("Math.max(Math.min(2+source*2,12),4)").unwrap();
        assert_eq!(expr.to_string(), "Math.max(Math.min((2 + (source * 2)), 12), 4)");
    }

    #[test]
    fn precedence_and_associativity() {
        let empty = Snapshot::new();
        assert_eq!(eval("2 + 3 * 4", &empty, None), Some(Value::Number(14.0)));
        assert_eq!(eval("10 - 4 - 3", &empty, None), Some(Value::Number(3.0)));
        assert_eq!(eval("-2 * -3", &empty, None), Some(Value::Number(6.0)));
        assert_eq!(eval("1 + 2 >= 3 && 4 < 5", &empty, None), Some(Value::Number(1.0)));
        assert_eq!(eval("!0 == 1", &empty, None), Some(Value::Number(1.0)));
    }

    #[test]
    fn conditional_and_dict() {
        let dict: Snapshot = [("skills.Common Knowledge", 6), ("advances", 3)]
            .into_iter()
            .collect();
        assert_eq!(
            eval(r#"dict["skills.Common Knowledge"] + 1"#, &dict, None),
            Some(Value::Number(7.0))
        );
        assert_eq!(
            eval("advances >= 4 ? 2 : source", &dict, Some(1.0)),
            Some(Value::Number(1.0))
        );
    }

    #[test]
    fn booleans_and_strings() {
        let dict: Snapshot = [("race", "Elf")].into_iter().collect();
        assert_eq!(eval("race == 'Elf' && true", &dict, None), Some(Value::Number(1.0)));
        assert_eq!(eval("\"d\" + 6", &dict, None), Some(Value::from("d6")));
    }

    #[test]
    fn unknown_function_is_rejected() {
        let errors = parse_formula("Math.pow(2, 3)").unwrap_err();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].message.contains("unknown function: Math.pow"), "{errors:?}");
        assert_eq!(errors[0].span, 0..14);

        let nested = parse_formula("1 + Math.max(sqrt(source), 2)").unwrap_err();
        assert!(nested.iter().any(|e| e.message.contains("unknown function: sqrt")), "{nested:?}");
    }

    #[test]
    fn syntax_errors_have_spans() {
        let errors = parse_formula("2 +").unwrap_err();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].span, 3..3);
        assert!(parse_formula("").is_err());
        assert!(parse_formula("2 # 3").is_err());
    }
}

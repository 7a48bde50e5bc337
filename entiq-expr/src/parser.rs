//! Recursive-descent expression grammar built on nom.
//!
//! The precedence chain runs OR → AND → NOT → comparison → additive →
//! multiplicative → unary → primary. Keywords are matched
//! case-insensitively and must end at a word boundary so that `ORDER`
//! is never read as `OR`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, not, opt, peek, recognize},
    error::ParseError,
    multi::{many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
};
use smol_str::SmolStr;

use crate::ast::{
    BinaryOp, CompareOp, Expression, FunctionCall, Literal, ParamRef, PathExpression, Predicate,
};
use crate::error::{ExprError, ExprResult};

/// Words that can never start a path expression.
const RESERVED: &[&str] = &[
    "and", "or", "not", "between", "like", "in", "is", "null", "true", "false", "case", "when",
    "then", "else", "end", "distinct", "exists", "asc", "desc", "select", "from", "where",
    "group", "by", "having", "order", "join", "on", "union", "intersect", "except",
];

fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    let (rest, ident) = take_while1(is_identifier_char).parse(input)?;
    if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alpha,
        )));
    }
    Ok((rest, ident))
}

/// An identifier that is not a reserved word (path heads, function names).
fn bare_identifier(input: &str) -> IResult<&str, &str> {
    let (rest, ident) = identifier(input)?;
    if RESERVED.contains(&ident.to_ascii_lowercase().as_str()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((rest, ident))
}

/// A keyword match that must end at a word boundary.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    move |input: &'a str| {
        let (rest, matched) = tag_no_case(kw).parse(input)?;
        not(peek(take_while1(is_identifier_char))).parse(rest)?;
        Ok((rest, matched))
    }
}

// ---------------------------------------------------------------------------
// Primaries
// ---------------------------------------------------------------------------

fn parse_string_literal(input: &str) -> IResult<&str, Literal> {
    map(delimited(char('\''), take_until("'"), char('\'')), |s: &str| {
        Literal::String(s.to_string())
    })
    .parse(input)
}

fn parse_number_literal(input: &str) -> IResult<&str, Literal> {
    let (rest, text) =
        recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)?;
    // No identifier char may follow, `1x` is not a number.
    not(peek(take_while1(is_identifier_char))).parse(rest)?;
    let literal = if text.contains('.') {
        match text.parse::<f64>() {
            Ok(f) => Literal::Float(f),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Float,
                )));
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Literal::Integer(i),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Digit,
                )));
            }
        }
    };
    Ok((rest, literal))
}

fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((
        parse_string_literal,
        parse_number_literal,
        map(keyword("true"), |_| Literal::Boolean(true)),
        map(keyword("false"), |_| Literal::Boolean(false)),
        map(keyword("null"), |_| Literal::Null),
    ))
    .parse(input)
}

fn parse_parameter(input: &str) -> IResult<&str, ParamRef> {
    alt((
        map(preceded(char(':'), identifier), |name| {
            ParamRef::Named(SmolStr::new(name))
        }),
        map(preceded(char('?'), digit1), |digits: &str| {
            ParamRef::Positional(digits.parse().unwrap_or(0))
        }),
    ))
    .parse(input)
}

fn parse_path(input: &str) -> IResult<&str, PathExpression> {
    // The head segment must not be a reserved word; tail segments after a
    // dot may be anything identifier-shaped.
    let (rest, head) = bare_identifier(input)?;
    let (rest, tail) = nom::multi::many0(preceded(char('.'), identifier)).parse(rest)?;
    let mut segments = vec![head];
    segments.extend(tail);
    Ok((rest, PathExpression::new(segments)))
}

fn parse_function_call(input: &str) -> IResult<&str, FunctionCall> {
    let (rest, name) = bare_identifier(input)?;
    let (rest, _) = preceded(multispace0, char('(')).parse(rest)?;
    // COUNT(*) has no argument expressions.
    if let Ok((rest, _)) = ws(char::<&str, nom::error::Error<&str>>('*')).parse(rest) {
        let (rest, _) = char(')').parse(rest)?;
        return Ok((rest, FunctionCall::new(name, Vec::new())));
    }
    let (rest, distinct) = opt(ws(keyword("distinct"))).parse(rest)?;
    let (rest, args) =
        separated_list0(ws(char(',')), parse_expression_inner).parse(rest)?;
    let (rest, _) = preceded(multispace0, char(')')).parse(rest)?;
    let mut call = FunctionCall::new(name, args);
    call.distinct = distinct.is_some();
    Ok((rest, call))
}

fn parse_case(input: &str) -> IResult<&str, Expression> {
    let (rest, _) = keyword("case").parse(input)?;
    let (rest, whens) = many1(pair(
        preceded(ws(keyword("when")), parse_predicate_inner),
        preceded(ws(keyword("then")), parse_expression_inner),
    ))
    .parse(rest)?;
    let (rest, otherwise) =
        opt(preceded(ws(keyword("else")), parse_expression_inner)).parse(rest)?;
    let (rest, _) = ws(keyword("end")).parse(rest)?;
    Ok((
        rest,
        Expression::Case {
            whens,
            otherwise: otherwise.map(Box::new),
        },
    ))
}

fn parse_primary(input: &str) -> IResult<&str, Expression> {
    preceded(
        multispace0,
        alt((
            parse_case,
            map(parse_literal, Expression::Literal),
            map(parse_parameter, Expression::Parameter),
            map(parse_function_call, Expression::Function),
            map(parse_path, Expression::Path),
            delimited(ws(char('(')), parse_expression_inner, ws(char(')'))),
        )),
    )
    .parse(input)
}

// ---------------------------------------------------------------------------
// Arithmetic precedence
// ---------------------------------------------------------------------------

fn parse_unary(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(char('-')), parse_unary), |expr| match expr {
            Expression::Literal(Literal::Integer(i)) => {
                Expression::Literal(Literal::Integer(-i))
            }
            Expression::Literal(Literal::Float(f)) => Expression::Literal(Literal::Float(-f)),
            other => Expression::Neg(Box::new(other)),
        }),
        parse_primary,
    ))
    .parse(input)
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_unary(input)?;
    let mut rest = input;
    let mut expr = lhs;
    loop {
        let op_parser = alt((
            map(char('*'), |_| BinaryOp::Mul),
            map(char('/'), |_| BinaryOp::Div),
            map(char('%'), |_| BinaryOp::Mod),
        ));
        match (ws(op_parser), parse_unary).parse(rest) {
            Ok((next, (op, rhs))) => {
                expr = Expression::Binary {
                    op,
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_additive(input: &str) -> IResult<&str, Expression> {
    let (input, lhs) = parse_multiplicative(input)?;
    let mut rest = input;
    let mut expr = lhs;
    loop {
        let op_parser = alt((
            map(char('+'), |_| BinaryOp::Add),
            map(char('-'), |_| BinaryOp::Sub),
        ));
        match (ws(op_parser), parse_multiplicative).parse(rest) {
            Ok((next, (op, rhs))) => {
                expr = Expression::Binary {
                    op,
                    lhs: Box::new(expr),
                    rhs: Box::new(rhs),
                };
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((rest, expr))
}

fn parse_expression_inner(input: &str) -> IResult<&str, Expression> {
    parse_additive(input)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

fn parse_compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        map(tag("<>"), |_| CompareOp::Ne),
        map(tag("!="), |_| CompareOp::Ne),
        map(tag("<="), |_| CompareOp::Le),
        map(tag(">="), |_| CompareOp::Ge),
        map(tag("="), |_| CompareOp::Eq),
        map(tag("<"), |_| CompareOp::Lt),
        map(tag(">"), |_| CompareOp::Gt),
    ))
    .parse(input)
}

/// A comparison or one of the postfix predicate forms on an expression.
fn parse_comparison(input: &str) -> IResult<&str, Predicate> {
    let (rest, lhs) = parse_expression_inner(input)?;

    // IS [NOT] NULL
    if let Ok((rest, _)) = ws(keyword("is")).parse(rest) {
        let (rest, negated) = opt(ws(keyword("not"))).parse(rest)?;
        let (rest, _) = ws(keyword("null")).parse(rest)?;
        return Ok((
            rest,
            Predicate::IsNull {
                expr: lhs,
                negated: negated.is_some(),
            },
        ));
    }

    // [NOT] BETWEEN / LIKE / IN
    let (rest, negated) = opt(ws(keyword("not"))).parse(rest)?;
    let negated = negated.is_some();

    if let Ok((rest, _)) = ws(keyword("between")).parse(rest) {
        let (rest, lower) = parse_additive(rest)?;
        let (rest, _) = ws(keyword("and")).parse(rest)?;
        let (rest, upper) = parse_additive(rest)?;
        return Ok((
            rest,
            Predicate::Between {
                expr: lhs,
                lower,
                upper,
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = ws(keyword("like")).parse(rest) {
        let (rest, pattern) = parse_additive(rest)?;
        return Ok((
            rest,
            Predicate::Like {
                expr: lhs,
                pattern,
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = ws(keyword("in")).parse(rest) {
        // Either a parenthesized list or a single (collection-valued)
        // parameter.
        if let Ok((rest, items)) = delimited(
            ws(char::<&str, nom::error::Error<&str>>('(')),
            separated_list1(ws(char(',')), parse_expression_inner),
            ws(char(')')),
        )
        .parse(rest)
        {
            return Ok((
                rest,
                Predicate::In {
                    expr: lhs,
                    items,
                    negated,
                },
            ));
        }
        let (rest, param) = ws(parse_parameter).parse(rest)?;
        return Ok((
            rest,
            Predicate::In {
                expr: lhs,
                items: vec![Expression::Parameter(param)],
                negated,
            },
        ));
    }

    if negated {
        // A dangling NOT without BETWEEN/LIKE/IN is not a comparison.
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }

    let (rest, op) = ws(parse_compare_op).parse(rest)?;
    let (rest, rhs) = parse_expression_inner(rest)?;
    Ok((
        rest,
        Predicate::Compare { op, lhs, rhs },
    ))
}

fn parse_predicate_primary(input: &str) -> IResult<&str, Predicate> {
    alt((
        parse_comparison,
        delimited(ws(char('(')), parse_predicate_inner, ws(char(')'))),
    ))
    .parse(input)
}

fn parse_not(input: &str) -> IResult<&str, Predicate> {
    alt((
        map(preceded(ws(keyword("not")), parse_not), |inner| {
            Predicate::Not(Box::new(inner))
        }),
        parse_predicate_primary,
    ))
    .parse(input)
}

fn parse_and(input: &str) -> IResult<&str, Predicate> {
    let (input, first) = parse_not(input)?;
    let mut rest = input;
    let mut parts = vec![first];
    loop {
        match preceded(ws(keyword("and")), parse_not).parse(rest) {
            Ok((next, part)) => {
                parts.push(part);
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    if parts.len() == 1 {
        Ok((rest, parts.pop().expect("single part")))
    } else {
        Ok((rest, Predicate::And(parts)))
    }
}

fn parse_or(input: &str) -> IResult<&str, Predicate> {
    let (input, first) = parse_and(input)?;
    let mut rest = input;
    let mut parts = vec![first];
    loop {
        match preceded(ws(keyword("or")), parse_and).parse(rest) {
            Ok((next, part)) => {
                parts.push(part);
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    if parts.len() == 1 {
        Ok((rest, parts.pop().expect("single part")))
    } else {
        Ok((rest, Predicate::Or(parts)))
    }
}

fn parse_predicate_inner(input: &str) -> IResult<&str, Predicate> {
    parse_or(input)
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

fn finish<T>(
    expected: &'static str,
    input: &str,
    result: IResult<&str, T>,
) -> ExprResult<T> {
    if input.trim().is_empty() {
        return Err(ExprError::Empty { expected });
    }
    match result {
        Ok((rest, value)) => {
            if rest.trim().is_empty() {
                Ok(value)
            } else {
                Err(ExprError::trailing(expected, rest.trim()))
            }
        }
        Err(_) => Err(ExprError::invalid(expected, input.trim())),
    }
}

/// Parse a complete value expression.
pub fn parse_expression(input: &str) -> ExprResult<Expression> {
    finish("expression", input, ws(parse_expression_inner).parse(input))
}

/// Parse a complete boolean predicate.
pub fn parse_predicate(input: &str) -> ExprResult<Predicate> {
    finish("predicate", input, ws(parse_predicate_inner).parse(input))
}

/// Parse a bare dotted path such as `customer.address.city`.
pub fn parse_path_expression(input: &str) -> ExprResult<PathExpression> {
    finish("path", input, ws(parse_path).parse(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, CompareOp, Expression, Literal, ParamRef, Predicate};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_path() {
        let path = parse_path_expression("customer.address.city").unwrap();
        assert_eq!(path.dotted(), "customer.address.city");
        assert_eq!(path.segments.len(), 3);
    }

    #[test]
    fn test_parse_rejects_reserved_path_head() {
        assert!(parse_path_expression("select.x").is_err());
        assert!(parse_path_expression("end").is_err());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            parse_expression("42").unwrap(),
            Expression::Literal(Literal::Integer(42))
        );
        assert_eq!(
            parse_expression("-3.5").unwrap(),
            Expression::Literal(Literal::Float(-3.5))
        );
        assert_eq!(
            parse_expression("'open'").unwrap(),
            Expression::Literal(Literal::String("open".into()))
        );
        assert_eq!(
            parse_expression("null").unwrap(),
            Expression::Literal(Literal::Null)
        );
    }

    #[test]
    fn test_parse_parameters() {
        assert_eq!(
            parse_expression(":minTotal").unwrap(),
            Expression::Parameter(ParamRef::Named("minTotal".into()))
        );
        assert_eq!(
            parse_expression("?1").unwrap(),
            Expression::Parameter(ParamRef::Positional(1))
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let expr = parse_expression("a + b * 2").unwrap();
        match expr {
            Expression::Binary { op: BinaryOp::Add, rhs, .. } => match *rhs {
                Expression::Binary { op: BinaryOp::Mul, .. } => {}
                other => panic!("expected Mul on rhs, got {other:?}"),
            },
            other => panic!("expected Add at root, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_function_call() {
        let expr = parse_expression("SIZE(o.items)").unwrap();
        match expr {
            Expression::Function(call) => {
                assert_eq!(call.name, "SIZE");
                assert_eq!(call.args.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_count_star_and_distinct() {
        match parse_expression("COUNT(*)").unwrap() {
            Expression::Function(call) => {
                assert_eq!(call.name, "COUNT");
                assert!(call.args.is_empty());
            }
            other => panic!("expected function, got {other:?}"),
        }
        match parse_expression("COUNT(DISTINCT o.customer)").unwrap() {
            Expression::Function(call) => {
                assert!(call.distinct);
                assert_eq!(call.args.len(), 1);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_comparison() {
        let pred = parse_predicate("o.total >= :min").unwrap();
        assert_eq!(
            pred,
            Predicate::Compare {
                op: CompareOp::Ge,
                lhs: Expression::path(["o", "total"]),
                rhs: Expression::Parameter(ParamRef::Named("min".into())),
            }
        );
    }

    #[test]
    fn test_parse_and_or_precedence() {
        let pred = parse_predicate("a = 1 OR b = 2 AND c = 3").unwrap();
        match pred {
            Predicate::Or(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[1], Predicate::And(_)));
            }
            other => panic!("expected Or at root, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_or_is_not_order() {
        // `ORDER` must not be split into `OR` + `DER`.
        assert!(parse_predicate("a = 1 ORDER").is_err());
    }

    #[test]
    fn test_parse_between() {
        let pred = parse_predicate("o.total BETWEEN 1 AND 10 AND o.open = true").unwrap();
        match pred {
            Predicate::And(parts) => {
                assert!(matches!(parts[0], Predicate::Between { negated: false, .. }));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_in_forms() {
        let pred = parse_predicate("o.status IN ('NEW', 'OPEN')").unwrap();
        assert!(matches!(pred, Predicate::In { ref items, .. } if items.len() == 2));

        let pred = parse_predicate("o.status NOT IN :statuses").unwrap();
        assert!(matches!(pred, Predicate::In { negated: true, ref items, .. } if items.len() == 1));
    }

    #[test]
    fn test_parse_is_null() {
        assert!(matches!(
            parse_predicate("o.customer IS NULL").unwrap(),
            Predicate::IsNull { negated: false, .. }
        ));
        assert!(matches!(
            parse_predicate("o.customer IS NOT NULL").unwrap(),
            Predicate::IsNull { negated: true, .. }
        ));
    }

    #[test]
    fn test_parse_grouped_predicate() {
        let pred = parse_predicate("(a = 1 OR b = 2) AND c = 3").unwrap();
        match pred {
            Predicate::And(parts) => assert!(matches!(parts[0], Predicate::Or(_))),
            other => panic!("expected And at root, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_case_expression() {
        let expr =
            parse_expression("CASE WHEN o.total > 100 THEN 'big' ELSE 'small' END").unwrap();
        match expr {
            Expression::Case { whens, otherwise } => {
                assert_eq!(whens.len(), 1);
                assert!(otherwise.is_some());
            }
            other => panic!("expected case, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_trailing_input_rejected() {
        assert!(matches!(
            parse_expression("a.b c"),
            Err(ExprError::TrailingInput { .. })
        ));
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert!(matches!(
            parse_predicate("   "),
            Err(ExprError::Empty { .. })
        ));
    }
}

//! End-to-end runs of the mutation pipeline against a real Z3 backend.

use msav_analysis::mcs::McsMode;
use msav_ast::ast::{BinOp, Block, Expr, IntWidth, Method, Param, Program, Span, Stmt, Type};
use msav_ast::resolve::ProgramFile;
use msav_engine::{mutate, Mutant, Source};
use msav_smt::backends::z3::Z3Solver;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn spanned(mut expr: Expr, start: usize, end: usize) -> Expr {
    expr.span = Span::new(start, end);
    expr
}

fn single_return_model(
    name: &str,
    params: Vec<(&str, Type)>,
    return_type: Type,
    target: Expr,
) -> ProgramFile {
    let method = Method {
        name: name.to_string(),
        params: params
            .into_iter()
            .map(|(name, ty)| Param {
                name: name.to_string(),
                ty,
            })
            .collect(),
        return_type,
        body: Block {
            stmts: vec![Stmt::Return {
                id: 1,
                span: Span::new(0, 1),
                expr: Some(target),
            }],
        },
    };
    ProgramFile {
        program: Program {
            methods: vec![method],
        },
        ..Default::default()
    }
}

fn conditions(mutants: &[Mutant]) -> Vec<String> {
    mutants.iter().map(|m| m.condition.to_string()).collect()
}

// `return x >= 32 && x < 127;` partitions the printable-ASCII test into five
// abstract states: below, at the lower edge, inside, at the upper edge, and
// above. Everything else the path crossing produces is contradictory and the
// solver drops it.
#[test]
fn printable_ascii_check_yields_five_guarded_mutants() -> TestResult {
    let text = "boolean check(int x) {\n    return x >= 32 && x < 127;\n}\n";
    let start = text.find("x >= 32").unwrap();
    let end = start + "x >= 32 && x < 127".len();
    let target = spanned(
        Expr::bin(
            BinOp::And,
            Expr::bin(BinOp::Ge, Expr::var("x"), Expr::int(32)),
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::int(127)),
        ),
        start,
        end,
    );
    let model = single_return_model(
        "check",
        vec![("x", Type::Integer(IntWidth::W32))],
        Type::Boolean,
        target,
    );
    let source = Source::new("Ascii.java", text);

    let mut solver = Z3Solver::new();
    let mutants = mutate(&source, &model, &mut solver, McsMode::Plain)?;

    assert_eq!(
        conditions(&mutants),
        vec![
            "x <= 31",
            "x == 32",
            "x >= 33 && x <= 126",
            "x == 127",
            "x >= 128",
        ]
    );

    let mids: Vec<u32> = mutants.iter().map(|m| m.mid).collect();
    assert_eq!(mids, vec![1, 2, 3, 4, 5]);

    assert_eq!(
        mutants[0].as_file_string(&source),
        "boolean check(int x) {\n    return ((x <= 31) \
         ? !(x >= 32 && x < 127) : (x >= 32 && x < 127));\n}\n"
    );
    Ok(())
}

#[test]
fn optimize_mode_keeps_the_same_survivors() -> TestResult {
    let text = "boolean check(int x) { return x >= 32 && x < 127; }";
    let start = text.find("x >= 32").unwrap();
    let end = start + "x >= 32 && x < 127".len();
    let target = spanned(
        Expr::bin(
            BinOp::And,
            Expr::bin(BinOp::Ge, Expr::var("x"), Expr::int(32)),
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::int(127)),
        ),
        start,
        end,
    );
    let model = single_return_model(
        "check",
        vec![("x", Type::Integer(IntWidth::W32))],
        Type::Boolean,
        target,
    );
    let source = Source::new("Ascii.java", text);

    let mut plain_solver = Z3Solver::new();
    let plain = mutate(&source, &model, &mut plain_solver, McsMode::Plain)?;
    let mut opt_solver = Z3Solver::new();
    let optimized = mutate(&source, &model, &mut opt_solver, McsMode::Optimize)?;

    assert_eq!(conditions(&plain), conditions(&optimized));
    Ok(())
}

// An equality comparison punctures the domain at the literal; both cells
// survive, the mixed crossings are pruned.
#[test]
fn equality_return_survives_as_the_punctured_pair() -> TestResult {
    let text = "boolean isFive(int x) { return x == 5; }";
    let start = text.find("x == 5").unwrap();
    let target = spanned(
        Expr::bin(BinOp::Eq, Expr::var("x"), Expr::int(5)),
        start,
        start + "x == 5".len(),
    );
    let model = single_return_model(
        "isFive",
        vec![("x", Type::Integer(IntWidth::W32))],
        Type::Boolean,
        target,
    );
    let source = Source::new("IsFive.java", text);

    let mut solver = Z3Solver::with_timeout_secs(10);
    let mutants = mutate(&source, &model, &mut solver, McsMode::Plain)?;

    assert_eq!(conditions(&mutants), vec!["x == 5", "x != 5"]);
    assert_eq!(
        mutants[0].log_line(&source),
        "1:MSAV:::IsFive.java:1,32:x == 5 |==> \
         ((x == 5) ? !(x == 5) : (x == 5))"
    );
    Ok(())
}

// An ordered comparison on a byte splits the domain at the literal; all
// three cells are reachable inside the 8-bit range.
#[test]
fn byte_split_keeps_all_three_cells() -> TestResult {
    let text = "boolean big(byte x) { return x > 126; }";
    let start = text.find("x > 126").unwrap();
    let target = spanned(
        Expr::bin(BinOp::Gt, Expr::var("x"), Expr::int(126)),
        start,
        start + "x > 126".len(),
    );
    let model = single_return_model(
        "big",
        vec![("x", Type::Integer(IntWidth::W8))],
        Type::Boolean,
        target,
    );
    let source = Source::new("Big.java", text);

    let mut solver = Z3Solver::new();
    let mutants = mutate(&source, &model, &mut solver, McsMode::Plain)?;
    assert_eq!(
        conditions(&mutants),
        vec!["x <= 125", "x == 126", "x >= 127"]
    );
    Ok(())
}

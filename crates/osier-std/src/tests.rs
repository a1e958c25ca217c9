use super::*;
use osier_lit::{Dict, Keyed, List};

fn parse(src: &str) -> El {
    osier_parser::parse(src).unwrap_or_else(|e| panic!("parse {src}: {e}"))
}

fn eval_el(env: &Scope, src: &str) -> El {
    let mut p = Prog::new();
    let r = p
        .resl(env, parse(src), &Type::VOID)
        .unwrap_or_else(|e| panic!("resl {src}: {e}"));
    p.eval(env, r, &Type::VOID)
        .unwrap_or_else(|e| panic!("eval {src}: {e}"))
}

fn eval_lit(src: &str) -> Lit {
    let env = std_scope();
    let el = eval_el(&env, src);
    match el.as_lit() {
        Some(l) => l.clone(),
        None => panic!("{src}: expected a literal result, got {el}"),
    }
}

fn eval_typ(src: &str) -> Type {
    let env = std_scope();
    let el = eval_el(&env, src);
    match el.as_typ() {
        Some(t) => t.clone(),
        None => panic!("{src}: expected a type result, got {el}"),
    }
}

fn num(n: f64) -> Lit {
    Lit::Num(n)
}

fn int(n: i64) -> Lit {
    Lit::Int(n)
}

fn chr(s: &str) -> Lit {
    Lit::Char(s.into())
}

fn string(s: &str) -> Lit {
    Lit::Str(s.into())
}

fn nums(ns: &[f64]) -> Lit {
    Lit::List(List::any(ns.iter().map(|n| Lit::Num(*n)).collect()))
}

// ── Literal and type atoms ───────────────────────────────────────

#[test]
fn atoms_and_type_symbols() {
    assert_eq!(eval_typ("~any"), Type::ANY);
    assert_eq!(eval_typ("bool"), Type::BOOL);
    assert_eq!(eval_typ("void"), Type::VOID);
    assert_eq!(eval_typ("raw"), Type::RAW);
    assert_eq!(eval_lit("null"), Lit::Nil);
    assert_eq!(eval_lit("true"), Lit::Bool(true));
    assert_eq!(eval_lit("7"), num(7.0));
    assert_eq!(eval_lit("'abc'"), chr("abc"));
    assert_eq!(eval_typ("(void anything)"), Type::VOID);
    assert_eq!(eval_typ("()"), Type::VOID);
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn construction() {
    assert_eq!(eval_lit("(true)"), Lit::Bool(true));
    assert_eq!(eval_lit("(bool)"), Lit::Bool(false));
    assert_eq!(eval_lit("(bool 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(bool 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ok 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(raw)"), Lit::Raw(vec![]));
    assert_eq!(eval_lit("(7)"), num(7.0));
    assert_eq!(eval_lit("(int 7)"), int(7));
    assert_eq!(eval_lit("(real 7)"), Lit::Real(7.0));
    assert_eq!(eval_lit("(str)"), string(""));
    assert_eq!(eval_lit("(str 'abc')"), string("abc"));
    assert_eq!(eval_lit("(raw 'abc')"), Lit::Raw(b"abc".to_vec()));
    assert_eq!(eval_lit("(time)"), Lit::Time(0));
    assert_eq!(eval_lit("(time null)"), Lit::Time(0));
}

#[test]
fn container_construction() {
    assert_eq!(
        eval_lit("(list (list|int 1 2 3))"),
        Lit::List(List::any(vec![int(1), int(2), int(3)]))
    );
    assert_eq!(
        eval_lit("(dict (dict|int x:2 y:3))"),
        Lit::Dict(Dict::any(vec![
            Keyed::new("x", int(2)),
            Keyed::new("y", int(3)),
        ]))
    );
    assert_eq!(
        eval_lit("(set {} x:2 y:3)"),
        Lit::Dict(Dict::any(vec![
            Keyed::new("x", num(2.0)),
            Keyed::new("y", num(3.0)),
        ]))
    );
    assert_eq!(
        eval_lit("({} x:2 y:3)"),
        Lit::Dict(Dict::any(vec![
            Keyed::new("x", num(2.0)),
            Keyed::new("y", num(3.0)),
        ]))
    );
}

// ── Logic and short-circuiting ───────────────────────────────────

#[test]
fn or_truth_table() {
    assert_eq!(eval_lit("(or)"), Lit::Bool(false));
    assert_eq!(eval_lit("(or 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(or 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(or 1 (fail))"), Lit::Bool(true));
    assert_eq!(eval_lit("(or 0 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(or 1 2 3)"), Lit::Bool(true));
}

#[test]
fn and_truth_table() {
    assert_eq!(eval_lit("(and)"), Lit::Bool(true));
    assert_eq!(eval_lit("(and 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(and 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(and 1 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(and 0 (fail))"), Lit::Bool(false));
    assert_eq!(eval_lit("(and 1 2 3)"), Lit::Bool(true));
    assert_eq!(eval_lit("(true 2 3)"), Lit::Bool(true));
    assert_eq!(eval_lit("((bool 1) 2 3)"), Lit::Bool(true));
}

#[test]
fn not_truth_table() {
    assert_eq!(eval_lit("(not)"), Lit::Bool(true));
    assert_eq!(eval_lit("(not 0)"), Lit::Bool(true));
    assert_eq!(eval_lit("(not 1)"), Lit::Bool(false));
    assert_eq!(eval_lit("(not 0 (fail))"), Lit::Bool(true));
    assert_eq!(eval_lit("(not 1 0)"), Lit::Bool(true));
    assert_eq!(eval_lit("(not 0 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(not 1 2 3)"), Lit::Bool(false));
}

// ── Comparison ───────────────────────────────────────────────────

#[test]
fn equality() {
    assert_eq!(eval_lit("(eq 1 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(eq (int 1) 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(equal (int 1) 1)"), Lit::Bool(false));
    assert_eq!(eval_lit("(equal (int 1) (int 1))"), Lit::Bool(true));
    assert_eq!(eval_lit("(ne 1 1)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ne 0 1)"), Lit::Bool(true));
    assert_eq!(eval_lit("(ne 1 1 1)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ne 1 1 2)"), Lit::Bool(true));
    assert_eq!(eval_lit("(ne 0 1 2)"), Lit::Bool(true));
    assert_eq!(eval_lit("(eq true (eq ['a'] ['a']))"), Lit::Bool(true));
}

#[test]
fn membership() {
    assert_eq!(eval_lit("(in 2 [1 2 3])"), Lit::Bool(true));
    assert_eq!(eval_lit("(ni 2 [1 2 3])"), Lit::Bool(false));
    assert_eq!(eval_lit("(in -1 [1 2 3])"), Lit::Bool(false));
    assert_eq!(eval_lit("(ni 5 [1 2 3])"), Lit::Bool(true));
}

#[test]
fn ordering() {
    assert_eq!(eval_lit("(lt 0 1 2)"), Lit::Bool(true));
    assert_eq!(eval_lit("(lt 2 1 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(lt 0 0 2)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ge 0 1 2)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ge 2 1 0)"), Lit::Bool(true));
    assert_eq!(eval_lit("(ge 0 0 2)"), Lit::Bool(false));
    assert_eq!(eval_lit("(ge 2 0 0)"), Lit::Bool(true));
    assert_eq!(eval_lit("(gt 0 1 2)"), Lit::Bool(false));
    assert_eq!(eval_lit("(gt 2 1 0)"), Lit::Bool(true));
    assert_eq!(eval_lit("(gt 0 0 2)"), Lit::Bool(false));
    assert_eq!(eval_lit("(gt 2 0 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(le 0 1 2)"), Lit::Bool(true));
    assert_eq!(eval_lit("(le 2 1 0)"), Lit::Bool(false));
    assert_eq!(eval_lit("(le 0 0 2)"), Lit::Bool(true));
    assert_eq!(eval_lit("(le 2 0 0)"), Lit::Bool(false));
}

// ── Arithmetic ───────────────────────────────────────────────────

#[test]
fn arithmetic() {
    assert_eq!(eval_lit("(add 1 2)"), num(3.0));
    assert_eq!(eval_lit("(add 1 2 3)"), num(6.0));
    assert_eq!(eval_lit("(add -5 2 3)"), num(0.0));
    assert_eq!(eval_lit("(1 2 3)"), num(6.0));
    assert_eq!(eval_lit("(add (int 1) 2 3)"), int(6));
    assert_eq!(eval_lit("(add (real 1) 2 3)"), Lit::Real(6.0));
    assert_eq!(eval_lit("((real 1) 2 3)"), Lit::Real(6.0));
    assert_eq!(
        eval_lit("(add (int? 1) 2 3)"),
        Lit::Some(Box::new(int(6)))
    );
    assert_eq!(eval_lit("(abs 1)"), num(1.0));
    assert_eq!(eval_lit("(abs -1)"), num(1.0));
    assert_eq!(eval_lit("(abs (int -1))"), int(1));
    assert_eq!(eval_lit("(min 1 2 3)"), num(1.0));
    assert_eq!(eval_lit("(min 3 2 1)"), num(1.0));
    assert_eq!(eval_lit("(max 1 2 3)"), num(3.0));
    assert_eq!(eval_lit("(max 3 2 1)"), num(3.0));
}

// ── Containers ───────────────────────────────────────────────────

#[test]
fn concatenation_and_append() {
    assert_eq!(eval_lit("(cat 'a' 'b' 'c')"), string("abc"));
    assert_eq!(eval_lit("('a' 'b' 'c')"), string("abc"));
    assert_eq!(eval_lit("(cat (raw 'a') 'b' 'c')"), Lit::Raw(b"abc".to_vec()));
    assert_eq!(eval_lit("(cat [1] [2] [3])"), nums(&[1.0, 2.0, 3.0]));
    assert_eq!(eval_lit("(apd [] 1 2 3)"), nums(&[1.0, 2.0, 3.0]));
    assert_eq!(eval_lit("([] 1 2 3)"), nums(&[1.0, 2.0, 3.0]));
}

#[test]
fn list_utilities() {
    assert_eq!(eval_lit("(len 'test')"), int(4));
    assert_eq!(eval_lit("(len [1 2 3])"), int(3));
    assert_eq!(eval_lit("(len {a:1 b:2})"), int(2));
    assert_eq!(eval_lit("(fst [1 2 3 4 5])"), num(1.0));
    assert_eq!(eval_lit("(lst [1 2 3 4 5])"), num(5.0));
    assert_eq!(eval_lit("(nth [1 2 3 4 5] 2)"), num(3.0));
    assert_eq!(eval_lit("(nth [1 2 3 4 5] -3)"), num(3.0));
    assert_eq!(
        eval_lit("(fst [1 2 3 4 5] (fn (eq (rem _ 2) 0)))"),
        num(2.0)
    );
    assert_eq!(
        eval_lit("(lst [1 2 3 4 5] (fn (eq (rem _ 2) 0)))"),
        num(4.0)
    );
    assert_eq!(
        eval_lit("(repeat 2 'cool')"),
        Lit::List(List::new(Type::CHAR, vec![chr("cool"), chr("cool")]))
    );
    assert_eq!(
        eval_lit("(range 3)"),
        Lit::List(List::new(Type::INT, vec![int(0), int(1), int(2)]))
    );
}

#[test]
fn map_filter_fold() {
    assert_eq!(
        eval_lit("(map (range 2) (fn ('row ' (1 _))))"),
        Lit::List(List::new(Type::CHAR, vec![chr("row 1"), chr("row 2")]))
    );
    assert_eq!(
        eval_lit("(filter [1 2 3 4 5] (fn (eq (rem _ 2) 0)))"),
        nums(&[2.0, 4.0])
    );
    assert_eq!(
        eval_lit("(filter [1 2 3 4 5] (fn (eq (rem _ 2) 1)))"),
        nums(&[1.0, 3.0, 5.0])
    );
    assert_eq!(
        eval_lit("(map [1 2 3 4] (fn (mul _ _)))"),
        Lit::List(List::new(
            Type::NUM,
            vec![num(1.0), num(4.0), num(9.0), num(16.0)]
        ))
    );
    assert_eq!(
        eval_lit(
            "(fold ['alice' 'bob' 'calvin'] (str 'hello')
                (fn (cat _ (if .2 ',') ' ' .1)))"
        ),
        string("hello alice, bob, calvin")
    );
    assert_eq!(
        eval_lit("(foldr [4 3] [1 2] (fn (apd _ .1)))"),
        nums(&[1.0, 2.0, 3.0, 4.0])
    );
    assert_eq!(
        eval_lit(
            "(foldr ['alice' 'bob' 'calvin'] (str 'hello')
                (fn a:str v:str i:int r:str (cat _ ' ' .1 (if .2 ','))))"
        ),
        string("hello calvin, bob, alice")
    );
}

// ── Conditionals ─────────────────────────────────────────────────

#[test]
fn if_chains() {
    assert_eq!(eval_lit("(if 1 2)"), num(2.0));
    assert_eq!(eval_lit("(if 1 2 (fail))"), num(2.0));
    assert_eq!(eval_lit("(if 1 2 (fail) 3)"), num(2.0));
    assert_eq!(eval_lit("(if 0 1 2 3)"), num(3.0));
    assert_eq!(eval_lit("(if 0 1 0 2 3)"), num(3.0));
    assert_eq!(eval_lit("(if 0 1 0 2)"), num(0.0));
    assert_eq!(eval_lit("(if 0 (fail) 2)"), num(2.0));
    assert_eq!(eval_lit("(if 0 (fail))"), Lit::Nil);
    assert_eq!(eval_lit("(if 1 'a')"), chr("a"));
    assert_eq!(eval_lit("(if 0 'a' 'b')"), chr("b"));
    assert_eq!(eval_lit("(if 0 'a')"), chr(""));
}

// ── Binding ──────────────────────────────────────────────────────

#[test]
fn let_bindings() {
    assert_eq!(eval_lit("(let a:(int 1) a)"), int(1));
    assert_eq!(eval_lit("(let a:1 b:2 c:(int (add a b)) c)"), int(3));
    assert_eq!(eval_lit("(let a:1 b:2 c:(add a b) (add a b c))"), num(6.0));
}

#[test]
fn let_type_refs() {
    assert_eq!(eval_typ("(let a:int @a)"), Type::INT);
    assert_eq!(eval_typ("(let a:<rec b:int> @a.b)"), Type::INT);
    assert_eq!(eval_typ("(let a:int b:list|@a @b)"), Type::list(Type::INT));
}

#[test]
fn with_scopes() {
    assert_eq!(eval_lit("(with 'test' .)"), chr("test"));
    assert_eq!(eval_lit("(with (<rec a:int> [1]) .a)"), int(1));
}

#[test]
fn functions() {
    assert_eq!(eval_lit("(let f:(fn 1) (f))"), num(1.0));
    assert_eq!(eval_lit("(let f:(fn (int 1)) (f))"), int(1));
    assert_eq!(eval_lit("(let f:(fn res:int 1) (f))"), int(1));
    assert_eq!(eval_lit("(let f:(fn (add _ 1)) (f 1))"), num(2.0));
    assert_eq!(eval_lit("(let f:(fn (mul _ _)) (f 3))"), num(9.0));
    assert_eq!(eval_lit("(let f:(fn (int (mul _ _))) (f 3))"), int(9));
    assert_eq!(eval_lit("(let f:(fn b:int r:int (mul _ _)) (f 3))"), int(9));
    assert_eq!(eval_lit("((fn (eq (add 1 1) 2)))"), Lit::Bool(true));
    assert_eq!(
        eval_lit("(let sum:(fn n:list|int res:int (fold _ 0 (fn (add _ .1)))) (sum 1 2 3))"),
        int(6)
    );
}

#[test]
fn composite_scenarios() {
    assert_eq!(
        eval_lit("(with [1 2 3 4 5] (eq (filter . (fn (eq (rem _ 2) (int 0)))) [2 4]))"),
        Lit::Bool(true)
    );
    assert_eq!(
        eval_lit("(with [1 2 3 4 5] (eq (fold . [0] (fn (apd _ .1))) [0 1 2 3 4 5]))"),
        Lit::Bool(true)
    );
    assert_eq!(
        eval_lit(
            "(with [1 2 3 4 5] (and
                (eq (foldr . (list [0]) (fn (apd _ .1))) [0 5 4 3 2 1])
                (eq (fold . (list [0]) (fn (apd _ .1))) [0 1 2 3 4 5])
            ))"
        ),
        Lit::Bool(true)
    );
    // the let body is a nested scope, so the walking form .? reaches the
    // with subject; a bare . only answers in the scope that binds it
    assert_eq!(
        eval_lit(
            "(with [1 2 3 4 5] (let even:(fn (eq (rem _ 2) 0)) (and
                (eq (len \"test\") 4)
                (eq (len .?) 5)
                (eq (fst .?) (nth .? 0) 1)
                (eq (lst .?) (nth .? -1) 5)
                (eq (fst .? even) 2)
                (eq (lst .? even) 4)
                (eq (nth .? 1 even) 4)
                (eq (nth .? -2 even) 2)
                (eq (filter .? even) [2 4])
                (eq (map .? even) [false true false true false])
                (eq (fold .? 0 (fn (add _ .1))) 15)
                (eq (foldr .? [0] (fn (apd _ .1))) [0 5 4 3 2 1])
                (eq (fold  .? [0] (fn (apd _ .1))) [0 1 2 3 4 5])
            )))"
        ),
        Lit::Bool(true)
    );
}

// ── fail ─────────────────────────────────────────────────────────

#[test]
fn fail_is_fatal_only_when_evaluated() {
    let env = std_scope();
    let el = parse("(fail 'oops')");
    let mut p = Prog::new();
    let r = p.resl(&env, el, &Type::VOID).expect("resl tolerates fail");
    let err = p.eval(&env, r, &Type::VOID).unwrap_err();
    assert!(err.to_string().contains("oops"));
}

// ── Partial resolution ───────────────────────────────────────────

fn part_env() -> Scope {
    let env = std_scope().child();
    env.def("x", Def::typed(Type::NUM));
    env.def("y", Def::typed(Type::NUM));
    env.def("v", Def::typed(Type::STR));
    env
}

fn part_str(env: &Scope, src: &str) -> (String, String) {
    let mut p = Prog::new();
    let h = p.fresh();
    let r = p
        .resl(env, parse(src), &h)
        .unwrap_or_else(|e| panic!("resl {src}: {e}"));
    let r = p
        .part(env, r, &h)
        .unwrap_or_else(|e| panic!("part {src}: {e}"));
    let t = p.res_typ(&r);
    (r.to_string(), t.to_string())
}

#[test]
fn partial_logic() {
    let env = part_env();
    for (src, want, typ) in [
        ("(or x)", "(ok x)", "bool"),
        ("(or 0 x)", "(ok x)", "bool"),
        ("(or 1 x)", "true", "bool"),
        ("(and x)", "(ok x)", "bool"),
        ("(and 0 x)", "false", "bool"),
        ("(and 1 x)", "(ok x)", "bool"),
        ("(and x v)", "(and x v)", "bool"),
        ("(not x)", "(not x)", "bool"),
        ("(bool x)", "(ok x)", "bool"),
        ("(not (ok x))", "(not x)", "bool"),
        ("(not (not x))", "(ok x)", "bool"),
        ("(not (not (not x)))", "(not x)", "bool"),
        ("(not (not (not (not x))))", "(ok x)", "bool"),
        ("(ok (bool x))", "(ok x)", "bool"),
        ("(bool (not x))", "(not x)", "bool"),
        ("(bool (not (bool x)))", "(not x)", "bool"),
        ("(bool (not (bool (not x))))", "(ok x)", "bool"),
    ] {
        let (got, got_typ) = part_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

#[test]
fn partial_conditionals() {
    let env = part_env();
    for (src, want, typ) in [
        ("(if 1 x)", "x", "num"),
        ("(if 0 1 x)", "x", "num"),
    ] {
        let (got, got_typ) = part_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

#[test]
fn partial_comparisons() {
    let env = part_env();
    for (src, want, typ) in [
        ("(eq 1 x)", "(eq 1 x)", "bool"),
        ("(eq 1 x 1)", "(eq 1 x)", "bool"),
        ("(eq 1 1 x)", "(eq 1 x)", "bool"),
        ("(eq x 1 1)", "(eq x 1)", "bool"),
        ("(eq x y 1)", "(eq x y 1)", "bool"),
        ("(lt 0 1 x)", "(lt 1 x)", "bool"),
        ("(lt 0 x 2)", "(lt 0 x 2)", "bool"),
        ("(lt x 1 2)", "(lt x 1)", "bool"),
    ] {
        let (got, got_typ) = part_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

#[test]
fn partial_arithmetic() {
    let env = part_env();
    for (src, want, typ) in [
        ("(add x 2 3)", "(add x 5)", "num"),
        ("(add 1 x 3)", "(add 4 x)", "num"),
        ("(add 1 2 x)", "(add 3 x)", "num"),
        ("(sub x 2 3)", "(sub x 5)", "num"),
        ("(sub 1 x 3)", "(sub -2 x)", "num"),
        ("(sub 1 2 x)", "(sub -1 x)", "num"),
        ("(mul x 2 3)", "(mul x 6)", "num"),
        ("(mul 6 x 3)", "(mul 18 x)", "num"),
        ("(mul 6 2 x)", "(mul 12 x)", "num"),
        ("(div x 2 3)", "(div x 6)", "num"),
        ("(div 6 x 3)", "(div 2 x)", "num"),
        ("(div 6 2 x)", "(div 3 x)", "num"),
        ("(1 2 x)", "(add 3 x)", "num"),
    ] {
        let (got, got_typ) = part_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

#[test]
fn partial_construction() {
    let env = part_env();
    for (src, want, typ) in [
        ("(int x)", "(con int x)", "int"),
        ("(abs (int x))", "(abs (con int x))", "int"),
        ("(abs (bool x))", "(abs (ok x))", "bool"),
    ] {
        let (got, got_typ) = part_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

// ── Resolution without evaluation ────────────────────────────────

fn resl_str(env: &Scope, src: &str) -> (String, String) {
    let mut p = Prog::new();
    let h = p.fresh();
    let r = p
        .resl(env, parse(src), &h)
        .unwrap_or_else(|e| panic!("resl {src}: {e}"));
    let r = p
        .realize(r)
        .unwrap_or_else(|e| panic!("realize {src}: {e}"));
    let t = p.res_typ(&r);
    (r.to_string(), t.to_string())
}

#[test]
fn resolve_keeps_canonical_calls() {
    let env = std_scope().child();
    env.def("d", Def::typed(Type::INT));
    for (src, want, typ) in [
        ("(or 0 1)", "(or 0 1)", "bool"),
        ("(and 0 1)", "(and 0 1)", "bool"),
        ("(bool 0)", "(ok 0)", "bool"),
        ("(not 0)", "(not 0)", "bool"),
        ("(if 0 1 2)", "(if 0 1 2)", "num"),
        ("(0 1)", "(add 0 1)", "num"),
        ("(d 1)", "(add d 1)", "int"),
        ("(mul 0 1)", "(mul 0 1)", "num"),
        ("(sub 0 1)", "(sub 0 1)", "num"),
        ("(div 0 1)", "(div 0 1)", "num"),
        ("(rem 0 1)", "(rem 0 1)", "int"),
        ("(abs -1)", "(abs -1)", "num"),
        ("(neg -1)", "(neg -1)", "num"),
        ("(min 0 1)", "(min 0 1)", "num"),
        ("(max 0 1)", "(max 0 1)", "num"),
        ("(eq 0 1)", "(eq 0 1)", "bool"),
        ("(ne 0 1)", "(ne 0 1)", "bool"),
        ("(in 0 [1])", "(in 0 [1])", "bool"),
        ("(ni 0 [1])", "(ni 0 [1])", "bool"),
        ("(lt 0 1)", "(lt 0 1)", "bool"),
        ("(cat [0] [1])", "(cat [0] [1])", "list"),
        ("([0] 1)", "(apd [0] 1)", "list"),
        ("(set {a:0} b:1)", "(set {a:0} b:1)", "dict"),
        ("(with {a:0} .a)", "(with {a:0} .a)", "num"),
        ("(let a:0 a)", "(let a:0 a)", "num"),
        ("(str '')", "(con str '')", "str"),
        ("(fn (add 1 _))", "(fn (add 1 _))", "<func num num>"),
        ("(fn (add d _))", "(fn (add d _))", "<func num int>"),
        ("((fn (add 1 _)) 1)", "((fn (add 1 _)) 1)", "num"),
        ("((fn (add d _)) 1)", "((fn (add d _)) 1)", "int"),
    ] {
        let (got, got_typ) = resl_str(&env, src);
        assert_eq!(got, want, "for {src}");
        assert_eq!(got_typ, typ, "type for {src}");
    }
}

// ── Resolution monotonicity ──────────────────────────────────────

#[test]
fn layouts_round_trip_through_write_and_parse() {
    // writing a resolved tree and reparsing it is observationally equal
    let env = std_scope();
    for src in [
        "(add 1 (mul 2 3))",
        "(let a:1 b:2 (add a b))",
        "(if 0 1 2)",
        "(set {a:0} b:1)",
        "(eq 1 (add 1 0))",
    ] {
        let mut p = Prog::new();
        let r = p.resl(&env, parse(src), &Type::VOID).unwrap();
        let written = r.to_string();
        let mut p2 = Prog::new();
        let r2 = p2.resl(&env, parse(&written), &Type::VOID).unwrap();
        let a = p.eval(&env, r, &Type::VOID).unwrap();
        let b = p2.eval(&env, r2, &Type::VOID).unwrap();
        assert_eq!(a.as_lit(), b.as_lit(), "for {src} written as {written}");
    }
}

// ── Property tests ───────────────────────────────────────────────

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn never_panics_on_parseable_input(
            s in proptest::string::string_regex(
                r"[\(\)\[\] a-z0-9+:.'_]{0,80}"
            ).unwrap()
        ) {
            if let Ok(el) = osier_parser::parse(&s) {
                let env = std_scope();
                let mut p = Prog::new();
                if let Ok(r) = p.resl(&env, el, &Type::VOID) {
                    let _ = p.eval(&env, r, &Type::VOID);
                }
            }
        }

        #[test]
        fn addition_chains_fold(ns in proptest::collection::vec(0i64..100, 2..6)) {
            let args: Vec<String> = ns.iter().map(|n| n.to_string()).collect();
            let src = format!("(add {})", args.join(" "));
            let want: i64 = ns.iter().sum();
            prop_assert_eq!(eval_lit(&src), Lit::Num(want as f64));
        }

        #[test]
        fn skipped_branches_never_run(cond in 0i64..2) {
            // a fail in the untaken branch must not be evaluated
            let src = format!("(if {cond} 1 2)");
            let guarded = format!("(if {cond} 1 (fail))");
            let plain = eval_lit(&src);
            if cond != 0 {
                prop_assert_eq!(eval_lit(&guarded), plain);
            }
        }
    }
}

#[test]
fn unresolved_set_shrinks_or_stops() {
    let env = part_env();
    // x and y resolve as types but never to values; the driver must settle
    let mut p = Prog::new();
    let el = parse("(add x (add y 1))");
    let r = p.resl(&env, el, &Type::VOID).unwrap();
    let first = p.unres.len();
    let r2 = p.resl(&env, r, &Type::VOID).unwrap();
    let second = p.unres.len();
    assert!(second <= first);
    // a second run over the settled tree is observationally stable
    assert_eq!(r2.to_string(), p.resl(&env, r2.clone(), &Type::VOID).unwrap().to_string());
}

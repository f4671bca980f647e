use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{
        alpha1, alphanumeric1, char, multispace0, newline, none_of, one_of, space0, space1,
    },
    combinator::{map, not, opt, peek, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::PortType;

/// A port parameter of a subtree, as in `tree Guard(in hp: int, out ok)`.
#[derive(Debug, PartialEq, Eq)]
pub struct PortDef<'src> {
    pub direction: PortType,
    pub name: &'src str,
    pub ty: Option<&'src str>,
}

/// A node of a tree definition, after desugaring.
#[derive(Debug, PartialEq, Eq)]
pub struct TreeDef<'src> {
    pub ty: &'src str,
    pub port_maps: Vec<PortMap<'src>>,
    pub children: Vec<TreeDef<'src>>,
    /// Variables declared in the children block of this node.
    pub vars: Vec<VarDef<'src>>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct VarDef<'src> {
    pub name: &'src str,
    pub init: Option<&'src str>,
}

impl<'src> TreeDef<'src> {
    pub fn new(ty: &'src str) -> Self {
        Self {
            ty,
            port_maps: vec![],
            children: vec![],
            vars: vec![],
        }
    }

    pub fn new_with_child(ty: &'src str, child: TreeDef<'src>) -> Self {
        Self::new_with_children(ty, vec![child])
    }

    pub fn new_with_children(ty: &'src str, children: Vec<TreeDef<'src>>) -> Self {
        Self {
            children,
            ..Self::new(ty)
        }
    }

    pub fn new_with_ports(ty: &'src str, port_maps: Vec<PortMap<'src>>) -> Self {
        Self {
            port_maps,
            ..Self::new(ty)
        }
    }

    fn new_with_tree_elems(ty: &'src str, children: Vec<TreeElem<'src>>) -> Self {
        Self::new_with_ports_and_tree_elems(ty, vec![], children)
    }

    /// Splits a children block into nodes and variable declarations. An
    /// initialized declaration becomes a `SetBool` node in place.
    fn new_with_ports_and_tree_elems(
        ty: &'src str,
        port_maps: Vec<PortMap<'src>>,
        elems: Vec<TreeElem<'src>>,
    ) -> Self {
        let mut children = vec![];
        let mut vars = vec![];
        for elem in elems {
            match elem {
                TreeElem::Node(node) => children.push(node),
                TreeElem::Var(var) => {
                    if let Some(init) = var.init {
                        children.push(TreeDef::new_with_ports(
                            "SetBool",
                            vec![
                                PortMap {
                                    ty: PortType::Input,
                                    node_port: "value",
                                    blackboard_value: BlackboardValue::Literal(init.to_owned()),
                                },
                                PortMap {
                                    ty: PortType::Output,
                                    node_port: "output",
                                    blackboard_value: BlackboardValue::Ref(var.name),
                                },
                            ],
                        ));
                    }
                    vars.push(var);
                }
            }
        }

        Self {
            ty,
            port_maps,
            children,
            vars,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum BlackboardValue<'src> {
    /// Literal value could have been unescaped, so it is an owned string.
    Literal(String),
    Ref(&'src str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct PortMap<'src> {
    pub ty: PortType,
    pub node_port: &'src str,
    pub blackboard_value: BlackboardValue<'src>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TreeRootDef<'src> {
    pub name: &'src str,
    pub root: TreeDef<'src>,
    pub ports: Vec<PortDef<'src>>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TreeSource<'src> {
    pub tree_defs: Vec<TreeRootDef<'src>>,
}

impl<'src> TreeSource<'src> {
    pub fn find(&self, name: &str) -> Option<&TreeRootDef<'src>> {
        self.tree_defs.iter().find(|tree| tree.name == name)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// `word` as a whole identifier, not the prefix of a longer one.
fn keyword<'src>(word: &'static str) -> impl FnMut(&'src str) -> IResult<&'src str, &'src str> {
    terminated(tag(word), not(peek(alt((alphanumeric1, tag("_"))))))
}

fn newlines(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, many1(one_of("\r\n")), space0))(i)
}

fn open_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('('), space0))(i)
}

fn close_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char(')'), space0))(i)
}

fn open_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('{'), space0))(i)
}

fn close_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('}'), space0))(i)
}

fn port_def(i: &str) -> IResult<&str, PortDef> {
    let (i, direction) = delimited(
        multispace0,
        alt((
            value(PortType::InOut, keyword("inout")),
            value(PortType::Input, keyword("in")),
            value(PortType::Output, keyword("out")),
        )),
        space1,
    )(i)?;
    let (i, name) = identifier(i)?;
    let (i, ty) = opt(preceded(delimited(space0, char(':'), space0), identifier))(i)?;
    let (i, _) = multispace0(i)?;
    Ok((
        i,
        PortDef {
            direction,
            name,
            ty,
        },
    ))
}

fn subtree_ports_def(i: &str) -> IResult<&str, Vec<PortDef>> {
    delimited(
        open_paren,
        many0(terminated(port_def, opt(pair(char(','), multispace0)))),
        close_paren,
    )(i)
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = delimited(multispace0, keyword("tree"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, ports) = opt(subtree_ports_def)(i)?;

    let (i, _) = delimited(space0, char('='), space0)(i)?;

    let (i, root) = parse_tree_node(i)?;

    Ok((
        i,
        TreeRootDef {
            name,
            root,
            ports: ports.unwrap_or_default(),
        },
    ))
}

fn line_comment<T>(i: &str) -> IResult<&str, Option<T>> {
    let (i, _) = tuple((space0, char('#'), opt(is_not("\n\r"))))(i)?;

    Ok((i, None))
}

fn some<I, R>(f: impl Fn(I) -> IResult<I, R>) -> impl Fn(I) -> IResult<I, Option<R>> {
    move |i| {
        let (i, res) = f(i)?;
        Ok((i, Some(res)))
    }
}

#[derive(Debug)]
enum TreeElem<'src> {
    Node(TreeDef<'src>),
    Var(VarDef<'src>),
}

fn tree_children(i: &str) -> IResult<&str, Vec<TreeElem>> {
    let (i, _) = many0(newlines)(i)?;

    let (i, v) = many0(delimited(
        space0,
        alt((
            line_comment,
            some(var_decl),
            some(parse_condition_node),
            some(|i| map(parse_conditional_expr, TreeElem::Node)(i)),
        )),
        many0(newlines),
    ))(i)?;

    let (i, _) = many0(newlines)(i)?;

    Ok((i, v.into_iter().flatten().collect()))
}

fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, input_ports) = opt(delimited(open_paren, port_maps, close_paren))(i)?;

    let (i, children) = opt(delimited(open_brace, tree_children, close_brace))(i)?;

    let (i, _) = opt(line_comment::<()>)(i)?;

    Ok((
        i,
        TreeDef::new_with_ports_and_tree_elems(
            ty,
            input_ports.unwrap_or_default(),
            children.unwrap_or_default(),
        ),
    ))
}

/// `!a`, `(a || b)` or a plain node.
fn parse_condition_factor(i: &str) -> IResult<&str, TreeDef> {
    alt((
        map(
            preceded(delimited(space0, char('!'), space0), parse_condition_factor),
            |res| TreeDef::new_with_child("Inverter", res),
        ),
        delimited(open_paren, parse_conditional_expr, close_paren),
        parse_tree_node,
    ))(i)
}

fn fold_operands<'src>(ty: &'src str, first: TreeDef<'src>, rest: Vec<TreeDef<'src>>) -> TreeDef<'src> {
    if rest.is_empty() {
        return first;
    }
    let mut children = vec![first];
    children.extend(rest);
    TreeDef::new_with_children(ty, children)
}

/// Operands of `&&` become the children of one `Sequence`.
fn parse_condition_and(i: &str) -> IResult<&str, TreeDef> {
    let (i, first) = parse_condition_factor(i)?;
    let (i, rest) = many0(preceded(
        delimited(space0, tag("&&"), space0),
        parse_condition_factor,
    ))(i)?;
    Ok((i, fold_operands("Sequence", first, rest)))
}

/// Operands of `||` become the children of one `Selector`. `&&` binds
/// tighter.
fn parse_conditional_expr(i: &str) -> IResult<&str, TreeDef> {
    let (i, first) = parse_condition_and(i)?;
    let (i, rest) = many0(preceded(
        delimited(space0, tag("||"), space0),
        parse_condition_and,
    ))(i)?;
    Ok((i, fold_operands("Selector", first, rest)))
}

fn parse_condition_node(i: &str) -> IResult<&str, TreeElem> {
    let (i, _) = delimited(space0, keyword("if"), space0)(i)?;

    let (i, condition) = delimited(open_paren, parse_conditional_expr, close_paren)(i)?;

    let (i, then_children) = delimited(open_brace, tree_children, close_brace)(i)?;

    let (i, else_children) = opt(delimited(
        pair(delimited(space0, keyword("else"), space0), open_brace),
        tree_children,
        close_brace,
    ))(i)?;

    let mut children = vec![
        condition,
        TreeDef::new_with_tree_elems("Sequence", then_children),
    ];

    if let Some(else_children) = else_children {
        children.push(TreeDef::new_with_tree_elems("Sequence", else_children));
    }

    Ok((
        i,
        TreeElem::Node(TreeDef::new_with_children("if", children)),
    ))
}

fn var_decl(i: &str) -> IResult<&str, TreeElem> {
    let (i, _) = delimited(space0, keyword("var"), space1)(i)?;

    let (i, name) = terminated(identifier, space0)(i)?;

    let (i, init) = opt(delimited(
        delimited(space0, char('='), space0),
        alt((keyword("true"), keyword("false"))),
        space0,
    ))(i)?;

    let (i, _) = opt(line_comment::<()>)(i)?;

    Ok((i, TreeElem::Var(VarDef { name, init })))
}

fn port_maps(i: &str) -> IResult<&str, Vec<PortMap>> {
    many0(delimited(
        multispace0,
        port_map,
        many0(pair(multispace0, char(','))),
    ))(i)
}

fn port_map(i: &str) -> IResult<&str, PortMap> {
    let (i, node_port) = delimited(space0, identifier, space0)(i)?;

    let (i, ty) = delimited(
        space0,
        alt((
            value(PortType::InOut, tag("<->")),
            value(PortType::Input, tag("<-")),
            value(PortType::Output, tag("->")),
        )),
        space0,
    )(i)?;

    let (i, blackboard_value) = delimited(space0, alt((bb_ref, str_literal)), space0)(i)?;

    // Writing to a literal is a parse error rather than a load error.
    if matches!(blackboard_value, BlackboardValue::Literal(_)) && ty != PortType::Input {
        return Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Verify,
        )));
    }

    Ok((
        i,
        PortMap {
            ty,
            node_port,
            blackboard_value,
        },
    ))
}

fn bb_ref(i: &str) -> IResult<&str, BlackboardValue> {
    map(identifier, BlackboardValue::Ref)(i)
}

fn str_literal(input: &str) -> IResult<&str, BlackboardValue> {
    let (r, val) = delimited(
        preceded(multispace0, char('\"')),
        many0(none_of("\"")),
        terminated(char('"'), multispace0),
    )(input)?;
    Ok((r, BlackboardValue::Literal(unescape(&val))))
}

/// Replaces `\\` and `\n`. Other backslashes are kept as written.
fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter().copied();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parses a whole source file into its tree definitions.
///
/// Parsing stops at the first statement it cannot read, so callers that
/// want to reject trailing garbage should check that the rest is empty.
pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, stmts) = many0(alt((
        delimited(multispace0, line_comment, newline),
        some(parse_tree),
    )))(i)?;

    // Eat up trailing newlines to indicate that the input was thoroughly consumed
    let (i, _) = multispace0(i)?;

    Ok((
        i,
        TreeSource {
            tree_defs: stmts.into_iter().flatten().collect(),
        },
    ))
}

use chumsky::prelude::*;
use std::fmt;

pub type Span = SimpleSpan;
pub type LexError<'src> = Rich<'src, char, Span>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'src> {
    pub name: &'src str,
    pub value: Option<&'src str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    Doctype(&'src str),
    Comment(&'src str),
    OpenTag {
        name: &'src str,
        attributes: Vec<Attribute<'src>>,
        self_closing: bool,
    },
    CloseTag(&'src str),
    // <script> and <style>: the body is raw text up to the matching close tag
    RawElement {
        name: &'src str,
        attributes: Vec<Attribute<'src>>,
        body: &'src str,
    },
    Text(&'src str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Doctype(doctype) => write!(f, "<!{doctype}>"),
            Self::Comment(comment) => write!(f, "<!--{comment}-->"),
            Self::OpenTag { name, .. } => write!(f, "<{name}>"),
            Self::CloseTag(name) => write!(f, "</{name}>"),
            Self::RawElement { name, .. } => write!(f, "<{name}>…</{name}>"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn tag_name<'src>() -> impl Parser<'src, &'src str, &'src str, extra::Err<LexError<'src>>> + Clone
{
    any()
        .filter(char::is_ascii_alphabetic)
        .then(
            any()
                .filter(|character: &char| {
                    character.is_ascii_alphanumeric() || matches!(character, '-' | ':' | '_')
                })
                .repeated(),
        )
        .to_slice()
}

fn attributes<'src>()
-> impl Parser<'src, &'src str, Vec<Attribute<'src>>, extra::Err<LexError<'src>>> + Clone {
    let name = any()
        .filter(|character: &char| {
            !character.is_whitespace() && !matches!(character, '"' | '\'' | '>' | '/' | '=' | '<')
        })
        .repeated()
        .at_least(1)
        .to_slice();

    let double_quoted = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''));

    let unquoted = any()
        .filter(|character: &char| {
            !character.is_whitespace() && !matches!(character, '"' | '\'' | '=' | '<' | '>' | '`')
        })
        .repeated()
        .at_least(1)
        .to_slice();

    let value = text::whitespace()
        .ignore_then(just('='))
        .ignore_then(text::whitespace())
        .ignore_then(choice((double_quoted, single_quoted, unquoted)));

    let attribute = name
        .then(value.or_not())
        .map(|(name, value)| Attribute { name, value });

    // After the first attribute no whitespace is required: browsers read
    // `value="a"b` as two attributes.
    let following = text::whitespace().ignore_then(attribute.clone()).repeated();

    text::whitespace()
        .at_least(1)
        .ignore_then(attribute)
        .then(following.collect::<Vec<_>>())
        .map(|(first, rest)| std::iter::once(first).chain(rest).collect::<Vec<_>>())
        .or_not()
        .map(Option::unwrap_or_default)
}

fn closing_tag<'src>(
    tag: &'static str,
) -> impl Parser<'src, &'src str, (), extra::Err<LexError<'src>>> + Clone {
    just("</")
        .ignore_then(tag_name().filter(move |name: &&str| name.eq_ignore_ascii_case(tag)))
        .then_ignore(text::whitespace())
        .then_ignore(just('>'))
        .ignored()
}

fn raw_element<'src>(
    tag: &'static str,
) -> impl Parser<'src, &'src str, Token<'src>, extra::Err<LexError<'src>>> + Clone {
    just('<')
        .ignore_then(tag_name().filter(move |name: &&str| name.eq_ignore_ascii_case(tag)))
        .then(attributes())
        .then_ignore(text::whitespace())
        .then_ignore(just('/').or_not())
        .then_ignore(just('>'))
        .then(any().and_is(closing_tag(tag).not()).repeated().to_slice())
        .then_ignore(closing_tag(tag))
        .map(|((name, attributes), body)| Token::RawElement {
            name,
            attributes,
            body,
        })
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<LexError<'src>>> {
    let comment = just("<!--")
        .ignore_then(any().and_is(just("-->").not()).repeated().to_slice())
        .then_ignore(just("-->"))
        .map(Token::Comment);

    let doctype = just("<!")
        .then_ignore(just("--").not())
        .ignore_then(none_of('>').repeated().to_slice())
        .then_ignore(just('>'))
        .map(Token::Doctype);

    let close_tag = just("</")
        .ignore_then(tag_name())
        .then_ignore(text::whitespace())
        .then_ignore(just('>'))
        .map(Token::CloseTag);

    let open_tag = just('<')
        .ignore_then(tag_name())
        .then(attributes())
        .then_ignore(text::whitespace())
        .then(just('/').or_not().map(|slash| slash.is_some()))
        .then_ignore(just('>'))
        .map(|((name, attributes), self_closing)| Token::OpenTag {
            name,
            attributes,
            self_closing,
        });

    let text = none_of('<').repeated().at_least(1).to_slice().map(Token::Text);

    // A '<' that cannot start markup ("a < b") is plain text, like in browsers.
    // Anything that looks like a tag but does not close is an error.
    let stray_less_than = just('<')
        .then_ignore(
            any()
                .filter(|character: &char| {
                    !character.is_ascii_alphabetic() && !matches!(character, '/' | '!')
                })
                .rewind()
                .ignored()
                .or(end()),
        )
        .to_slice()
        .map(Token::Text);

    let token = choice((
        comment,
        doctype,
        raw_element("script"),
        raw_element("style"),
        close_tag,
        open_tag,
        text,
        stray_less_than,
    ));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

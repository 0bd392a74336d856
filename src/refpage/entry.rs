//! Reference page parsing.
//!
//! A page is walked as a stream of XML tokens. Recognized sections are
//! handed to a matching handler; everything else is scanned through
//! without effect, so unknown or future sections never fail a page. A
//! stream that simply ends early truncates the page silently, while a
//! stream that cannot be tokenized at all is a hard parse error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use phf::phf_set;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use super::text::sanitize;
use super::RefError;

/// Error constants a page's errors section may legitimately list.
/// Anything else named in a `constant` element there is ignored.
pub static KNOWN_ERRORS: phf::Set<&'static str> = phf_set! {
    "GL_OUT_OF_MEMORY",
    "GL_INVALID_ENUM",
    "GL_INVALID_VALUE",
    "GL_INVALID_OPERATION",
    "GL_STACK_OVERFLOW",
    "GL_STACK_UNDERFLOW",
    "GL_INVALID_FRAMEBUFFER_OPERATION",
    "GL_CONTEXT_LOST",
    "GL_TABLE_TOO_LARGE",
};

/// A simplified reference page, covering one or more related functions.
///
/// The page for `glUniform` documents `glUniform2d`, `glUniform3fv`,
/// `glUniformMatrix4fv` and friends; each of those appears in `funcs`
/// while the page itself carries the shared name, summary, parameter
/// table, cross references, and error constants.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Shorthand name shared by every function on the page.
    pub name: String,
    /// One-line summary for the whole page, typically without a subject
    /// or closing punctuation, e.g. "return the value or values of a
    /// selected parameter".
    pub desc: String,
    /// Full prototypes of the functions the page documents.
    #[serde(rename = "functions")]
    pub funcs: Vec<Function>,
    /// Parameter name to description. Inner markup and layout whitespace
    /// are flattened away; the values are plain sentences.
    pub params: HashMap<String, String>,
    /// Names of related pages, in document order.
    pub seealso: Vec<String>,
    /// Error constants the functions may raise, restricted to
    /// [`KNOWN_ERRORS`] and deduplicated in first-seen order.
    pub errors: Vec<String>,
}

/// One function prototype: its full name and ordered argument names.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<String>,
}

impl Entry {
    /// Parse a single reference page document.
    ///
    /// The resulting name is empty when the document neither carries an
    /// `id` attribute on its root element nor a `refname`; [`Entry::load`]
    /// falls back to the file name in that case.
    pub fn parse(xml: &str) -> Result<Entry, RefError> {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.expand_empty_elements = true;

        // Skip prolog noise (declaration, doctype, comments) up to the
        // document's root element.
        let root = loop {
            match reader.read_event()? {
                Event::Start(e) => break e,
                Event::Eof => return Err(RefError::NoRoot),
                _ => {}
            }
        };

        let mut entry = Entry::default();
        for attr in root.attributes().flatten() {
            if attr.key.local_name().as_ref() == b"id" {
                entry.name = attr_text(&attr);
            }
        }

        let root_name = root.local_name().as_ref().to_vec();
        let mut depth = 0usize;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if e.local_name().as_ref() == root_name.as_slice() {
                        depth += 1;
                    }
                    match e.local_name().as_ref() {
                        b"refnamediv" => parse_desc(&mut reader, &mut entry)?,
                        b"refsynopsisdiv" => parse_funcs(&mut reader, &mut entry)?,
                        b"refsect1" => dispatch_sect(&mut reader, &e, &mut entry)?,
                        _ => {}
                    }
                }
                Event::End(e) => {
                    if e.local_name().as_ref() == root_name.as_slice() {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(entry)
    }

    /// Load a reference page from disk.
    ///
    /// When the document does not name itself, the file's stem serves as
    /// the page name, so a loaded entry always has one.
    pub fn load(path: &Path) -> Result<Entry, RefError> {
        let xml = fs::read_to_string(path).map_err(|source| RefError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut entry = Entry::parse(&xml)?;
        if entry.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                entry.name = stem.to_string();
            }
        }
        Ok(entry)
    }

    /// Prototype with the given full function name, if the page has one.
    pub fn func(&self, name: &str) -> Option<&Function> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

type XmlReader<'a> = Reader<&'a [u8]>;

/// Decoded text content. Unknown DTD entities stay literal rather than
/// failing the page; the upstream files are full of them.
fn text_of(text: &BytesText) -> String {
    match text.unescape() {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(text.as_ref()).into_owned(),
    }
}

/// Decoded attribute value, with the same entity leniency as [`text_of`].
fn attr_text(attr: &Attribute) -> String {
    match attr.unescape_value() {
        Ok(v) => v.into_owned(),
        Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
    }
}

/// Concatenate every piece of character data until the matching `end`
/// element closes, at any nesting depth, discarding the markup itself.
fn flatten(reader: &mut XmlReader, end: &[u8]) -> Result<String, RefError> {
    let mut out = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == end => depth += 1,
            Event::End(e) if e.local_name().as_ref() == end => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Text(t) => out.push_str(&text_of(&t)),
            Event::CData(t) => out.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// `refnamediv`: the page's short name and purpose line.
///
/// The purpose always replaces whatever was there before; the name is
/// only a fallback for pages without an `id` attribute.
fn parse_desc(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut name = String::new();
    let mut desc = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"refname" => name = sanitize(&flatten(reader, b"refname")?),
                b"refpurpose" => desc = sanitize(&flatten(reader, b"refpurpose")?),
                b"refnamediv" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"refnamediv" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if entry.name.is_empty() && !name.is_empty() {
        entry.name = name;
    }
    entry.desc = desc;
    Ok(())
}

/// `refsynopsisdiv`: function prototypes, appended in document order.
/// A page may carry several synopsis sections; they accumulate.
fn parse_funcs(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"funcprototype" => {
                    let func = parse_prototype(reader)?;
                    entry.funcs.push(func);
                }
                b"refsynopsisdiv" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"refsynopsisdiv" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// One `funcprototype`: the `function` element names it, each
/// `parameter` element adds one argument. `<paramdef>void</paramdef>`
/// has no `parameter` child and contributes nothing.
fn parse_prototype(reader: &mut XmlReader) -> Result<Function, RefError> {
    let mut func = Function::default();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"function" => func.name = sanitize(&flatten(reader, b"function")?),
                b"parameter" => {
                    let arg = sanitize(&flatten(reader, b"parameter")?);
                    func.args.push(arg);
                }
                b"funcprototype" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"funcprototype" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(func)
}

/// `refsect1`: dispatched on its `id` attribute. Unrecognized ids fall
/// through, leaving their content to be scanned like any other markup.
fn dispatch_sect(
    reader: &mut XmlReader,
    start: &BytesStart,
    entry: &mut Entry,
) -> Result<(), RefError> {
    let mut id = String::new();
    for attr in start.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"id" {
            id = attr_text(&attr);
            break;
        }
    }
    match id.as_str() {
        "parameters" | "parameters2" | "parameters3" => parse_params(reader, entry),
        "seealso" => parse_seealso(reader, entry),
        "errors" => parse_errors(reader, entry),
        _ => Ok(()),
    }
}

/// Parameters section: a `variablelist` of `varlistentry` items.
fn parse_params(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"varlistentry" => parse_param_entry(reader, entry)?,
                b"refsect1" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"refsect1" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// One `varlistentry`: every `parameter` named in its terms receives a
/// copy of the flattened `listitem` description.
fn parse_param_entry(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut names: Vec<String> = Vec::new();
    let mut desc = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"term" => collect_term_params(reader, &mut names)?,
                b"listitem" => {
                    desc = sanitize(&flatten(reader, b"listitem")?).trim().to_string();
                }
                b"varlistentry" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"varlistentry" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    for name in names {
        entry.params.insert(name, desc.clone());
    }
    Ok(())
}

/// Parameter names inside one `term` element. Listitem text mentions
/// parameters too, which is why collection stops at the term boundary.
fn collect_term_params(reader: &mut XmlReader, names: &mut Vec<String>) -> Result<(), RefError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"parameter" => names.push(sanitize(&flatten(reader, b"parameter")?)),
                b"term" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"term" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// See-also section: referenced page titles, verbatim and unfiltered.
fn parse_seealso(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"refentrytitle" => {
                    let name = sanitize(&flatten(reader, b"refentrytitle")?);
                    entry.seealso.push(name);
                }
                b"refsect1" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"refsect1" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Errors section: `constant` elements name both error values and plain
/// enum values in the surrounding prose, so only members of
/// [`KNOWN_ERRORS`] are kept, each at most once.
fn parse_errors(reader: &mut XmlReader, entry: &mut Entry) -> Result<(), RefError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"constant" => {
                    let name = sanitize(&flatten(reader, b"constant")?);
                    if KNOWN_ERRORS.contains(name.as_str()) && !entry.errors.contains(&name) {
                        entry.errors.push(name);
                    }
                }
                b"refsect1" => depth += 1,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"refsect1" => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLFOO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<refentry id="glFoo">
    <refnamediv>
        <refname>glFoo</refname>
        <refpurpose>does foo</refpurpose>
    </refnamediv>
    <refsynopsisdiv>
        <funcsynopsis>
            <funcprototype>
                <funcdef>void <function>glFoo</function></funcdef>
                <paramdef>GLenum <parameter>x</parameter></paramdef>
                <paramdef>GLfloat <parameter>y</parameter></paramdef>
            </funcprototype>
        </funcsynopsis>
    </refsynopsisdiv>
    <refsect1 id="parameters">
        <variablelist>
            <varlistentry>
                <term><parameter>x</parameter></term>
                <listitem><para>the x thing</para></listitem>
            </varlistentry>
            <varlistentry>
                <term><parameter>y</parameter></term>
                <listitem><para>the y thing</para></listitem>
            </varlistentry>
        </variablelist>
    </refsect1>
    <refsect1 id="seealso">
        <para><citerefentry><refentrytitle>glBar</refentrytitle></citerefentry></para>
    </refsect1>
    <refsect1 id="errors">
        <para><constant>GL_INVALID_ENUM</constant> is generated sometimes.</para>
        <para><constant>GL_INVALID_VALUE</constant> is generated other times.</para>
        <para><constant>GL_BOGUS</constant> is not a real error.</para>
    </refsect1>
</refentry>
"#;

    #[test]
    fn test_parse_full_page() {
        let entry = Entry::parse(GLFOO).expect("should parse");

        assert_eq!(entry.name, "glFoo");
        assert_eq!(entry.desc, "does foo");
        assert_eq!(entry.funcs.len(), 1);
        assert_eq!(entry.funcs[0].name, "glFoo");
        assert_eq!(entry.funcs[0].args, vec!["x", "y"]);
        assert_eq!(entry.params.get("x").map(String::as_str), Some("the x thing"));
        assert_eq!(entry.params.get("y").map(String::as_str), Some("the y thing"));
        assert_eq!(entry.seealso, vec!["glBar"]);
        assert_eq!(entry.errors, vec!["GL_INVALID_ENUM", "GL_INVALID_VALUE"]);
    }

    #[test]
    fn test_id_attribute_wins_over_refname() {
        let xml = r#"<refentry id="glReal">
            <refnamediv><refname>glOther</refname><refpurpose>p</refpurpose></refnamediv>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.name, "glReal");
        assert_eq!(entry.desc, "p");
    }

    #[test]
    fn test_refname_fallback_without_id() {
        let xml = r#"<refentry>
            <refnamediv><refname>glFromName</refname><refpurpose>p</refpurpose></refnamediv>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.name, "glFromName");
    }

    #[test]
    fn test_name_empty_without_id_and_refname() {
        let entry = Entry::parse("<refentry><refsect1 id=\"notes\"/></refentry>").expect("should parse");
        assert!(entry.name.is_empty());
    }

    #[test]
    fn test_unknown_sections_are_skipped() {
        let xml = r#"<refentry id="glFoo">
            <refmeta><refentrytitle>glFoo</refentrytitle></refmeta>
            <refsect1 id="description"><para>A <parameter>x</parameter> mention
                and a <constant>GL_INVALID_ENUM</constant> mention.</para></refsect1>
            <refsect1 id="notes"><para>notes</para></refsect1>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        // Mentions outside recognized sections contribute nothing.
        assert!(entry.params.is_empty());
        assert!(entry.errors.is_empty());
        // refmeta's refentrytitle is not a see-also reference.
        assert!(entry.seealso.is_empty());
    }

    #[test]
    fn test_multiple_synopsis_sections_accumulate() {
        let xml = r#"<refentry id="glFoo">
            <refsynopsisdiv><funcsynopsis><funcprototype>
                <funcdef>void <function>glFoo1</function></funcdef>
                <paramdef>GLint <parameter>a</parameter></paramdef>
            </funcprototype></funcsynopsis></refsynopsisdiv>
            <refsynopsisdiv><funcsynopsis><funcprototype>
                <funcdef>void <function>glFoo2</function></funcdef>
                <paramdef>void</paramdef>
            </funcprototype></funcsynopsis></refsynopsisdiv>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.funcs.len(), 2);
        assert_eq!(entry.funcs[0].name, "glFoo1");
        assert_eq!(entry.funcs[0].args, vec!["a"]);
        assert_eq!(entry.funcs[1].name, "glFoo2");
        assert!(entry.funcs[1].args.is_empty());
    }

    #[test]
    fn test_param_fanout_shares_description() {
        let xml = r#"<refentry id="glFoo">
            <refsect1 id="parameters"><variablelist><varlistentry>
                <term><parameter>a</parameter></term>
                <term><parameter>b</parameter></term>
                <listitem><para>shared
                    text</para></listitem>
            </varlistentry></variablelist></refsect1>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.params.get("a").map(String::as_str), Some("shared text"));
        assert_eq!(entry.params.get("b").map(String::as_str), Some("shared text"));
    }

    #[test]
    fn test_param_description_flattens_nested_markup() {
        let xml = r#"<refentry id="glFoo">
            <refsect1 id="parameters"><variablelist><varlistentry>
                <term><parameter>mode</parameter></term>
                <listitem><para>accepts <constant>GL_POINTS</constant> and
                    <constant>GL_LINES</constant> values</para></listitem>
            </varlistentry></variablelist></refsect1>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(
            entry.params.get("mode").map(String::as_str),
            Some("accepts GL_POINTS and GL_LINES values")
        );
    }

    #[test]
    fn test_errors_filtered_and_deduplicated() {
        let xml = r#"<refentry id="glFoo">
            <refsect1 id="errors">
                <para><constant>GL_INVALID_VALUE</constant> if count is negative.</para>
                <para><constant>GL_TRIANGLES</constant> is an enum, not an error.</para>
                <para><constant>GL_INVALID_VALUE</constant> again.</para>
                <para><constant>GL_INVALID_ENUM</constant> if mode is bad.</para>
            </refsect1>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.errors, vec!["GL_INVALID_VALUE", "GL_INVALID_ENUM"]);
        for name in &entry.errors {
            assert!(KNOWN_ERRORS.contains(name.as_str()));
        }
    }

    #[test]
    fn test_later_description_replaces_earlier() {
        let xml = r#"<refentry id="glFoo">
            <refnamediv><refname>glFoo</refname><refpurpose>first</refpurpose></refnamediv>
            <refnamediv><refname>glFoo</refname><refpurpose>second</refpurpose></refnamediv>
        </refentry>"#;
        let entry = Entry::parse(xml).expect("should parse");
        assert_eq!(entry.desc, "second");
    }

    #[test]
    fn test_truncated_document_is_not_an_error() {
        let xml = r#"<refentry id="glFoo">
            <refsect1 id="errors">
                <para><constant>GL_INVALID_ENUM</constant>"#;
        let entry = Entry::parse(xml).expect("truncation should not fail");
        assert_eq!(entry.name, "glFoo");
        assert_eq!(entry.errors, vec!["GL_INVALID_ENUM"]);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        // An unterminated comment cannot be tokenized.
        assert!(Entry::parse("<refentry id=\"glFoo\"><!-- never closed").is_err());
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(Entry::parse("").is_err());
        assert!(Entry::parse("<?xml version=\"1.0\"?>").is_err());
    }

    #[test]
    fn test_func_lookup() {
        let entry = Entry::parse(GLFOO).expect("should parse");
        assert_eq!(entry.func("glFoo").map(|f| f.args.len()), Some(2));
        assert!(entry.func("glBar").is_none());
    }
}

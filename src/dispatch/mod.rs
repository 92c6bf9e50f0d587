//! Default-view dispatcher.
//!
//! Maps a runtime value to a `View<Child>` by shape:
//!
//! ```text
//! View        -> as-is
//! Custom      -> Visualize::view
//! scalar      -> token text
//! List/Tuple  -> switch(sequence)
//! Set         -> switch(sequence)
//! Dict        -> switch(key_values)
//! Function    -> switch(sequence[args, kwargs])
//! Module      -> switch(key_values over public attributes)
//! Class       -> switch(sequence[functions, fields])
//! Object      -> switch(key_values over own attributes)
//! ```
//!
//! Synthesis is shallow: sub-values are referenced as `Child::Value` and get their
//! own cache entries, so a container that holds itself simply refers to its own id.
//! `Visualize` impls reference other values with `ViewContext::view`. Embedding a
//! copy of another value's view is explicit (`ViewContext::inline`) and goes
//! through the visitation guard.

pub mod policy;

pub use policy::{switch_key_values, switch_sequence, CollectionSpec, Mode};

use crate::config::DispatchOptions;
use crate::error::DispatchError;
use crate::model::{Child, View};
use crate::value::{Attr, Heap, ObjRef, Param, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, trace};

/// A value that describes its own view.
pub trait Visualize: fmt::Debug {
    /// Build this value's view. Use `cx.view(..)` to reference another value and
    /// `cx.inline(..)` to embed a copy of its default view.
    fn view(&self, cx: &mut ViewContext<'_>) -> Result<View<Child>, DispatchError>;

    /// Name used in type displays and comparison errors.
    fn type_name(&self) -> &str {
        "Custom"
    }
}

/// Handle passed to `Visualize::view`.
pub struct ViewContext<'a> {
    heap: &'a Heap,
    dispatcher: &'a mut Dispatcher,
    this: ObjRef,
}

impl<'a> ViewContext<'a> {
    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    /// The value being visualized.
    pub fn this(&self) -> ObjRef {
        self.this
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.dispatcher.options
    }

    /// Reference `obj`. It is cached under its own id, so every reference to one
    /// value within a snapshot resolves to the same view.
    pub fn view(&self, obj: ObjRef) -> Child {
        Child::Value(obj)
    }

    /// Embed a copy of `obj`'s view.
    ///
    /// The copy is cached under the embedding slot, not under `obj`'s id. If `obj`
    /// is already being synthesized further up this traversal, a reference is
    /// returned instead.
    pub fn inline(&mut self, obj: ObjRef) -> Result<Child, DispatchError> {
        self.dispatcher.guarded(self.heap, obj)
    }
}

/// Output of one synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub view: View<Child>,
    /// Values referenced anywhere in `view`, in discovery order, without duplicates.
    pub refs: Vec<ObjRef>,
}

/// Synthesizes default views.
#[derive(Debug, Default)]
pub struct Dispatcher {
    options: DispatchOptions,
    /// Values currently being synthesized in this traversal.
    placeholders: HashSet<ObjRef>,
}

impl Dispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        Self {
            options,
            placeholders: HashSet::new(),
        }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Synthesize the view of `obj` and list the values it references.
    pub fn synthesize(&mut self, heap: &Heap, obj: ObjRef) -> Result<Synthesized, DispatchError> {
        self.placeholders.clear();
        let view = self.enter(heap, obj)?;
        let refs = value_refs(&view);
        trace!(value = %obj, kind = %view.kind_tag(), refs = refs.len(), "synthesized view");
        Ok(Synthesized { view, refs })
    }

    fn guarded(&mut self, heap: &Heap, obj: ObjRef) -> Result<Child, DispatchError> {
        if self.placeholders.contains(&obj) {
            trace!(value = %obj, "cycle in custom view, referencing instead");
            return Ok(Child::Value(obj));
        }
        Ok(Child::from(self.enter(heap, obj)?))
    }

    fn enter(&mut self, heap: &Heap, obj: ObjRef) -> Result<View<Child>, DispatchError> {
        self.placeholders.insert(obj);
        let result = self.dispatch(heap, obj);
        self.placeholders.remove(&obj);
        result
    }

    fn dispatch(&mut self, heap: &Heap, obj: ObjRef) -> Result<View<Child>, DispatchError> {
        let value = heap.get(obj).ok_or(DispatchError::UnknownValue(obj))?;
        let view = match value {
            Value::View(view) => view.clone(),
            Value::Custom(custom) => {
                let mut cx = ViewContext {
                    heap,
                    dispatcher: self,
                    this: obj,
                };
                custom.view(&mut cx)?
            }
            Value::Null => View::token("None"),
            Value::Bool(b) => View::token(if *b { "True" } else { "False" }),
            Value::Int(i) => View::token(i.to_string()),
            Value::Float(f) => View::token(float_text(*f)),
            Value::Str(s) => View::token(format!("\"{}\"", s)),
            Value::List(items) => self.collection(items, "List", "[", "]")?,
            Value::Tuple(items) => self.collection(items, "Tuple", "(", ")")?,
            Value::Set(items) => self.collection(items, "Set", "{", "}")?,
            Value::Dict(pairs) => {
                let header = format!("Dict[{}]", pairs.len());
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| (Child::Value(*k), Child::Value(*v)))
                    .collect();
                let spec = CollectionSpec::new(format!("{} {{", header), "}", header);
                switch_key_values(&self.options, pairs, &spec)?
            }
            Value::Function { name, params } => self.function(name, params)?,
            Value::Module { name, attrs } => self.module(heap, obj, name, attrs)?,
            Value::Class { name, attrs } => self.class(heap, obj, name, attrs)?,
            Value::Object { class, attrs } => self.object(heap, obj, *class, attrs)?,
        };
        Ok(view)
    }

    fn collection(
        &self,
        items: &[ObjRef],
        kind: &str,
        open: &str,
        close: &str,
    ) -> Result<View<Child>, DispatchError> {
        let header = format!("{}[{}]", kind, items.len());
        let elements = items.iter().copied().map(Child::Value).collect();
        let spec = CollectionSpec::new(format!("{} {}", header, open), close, header);
        Ok(switch_sequence(&self.options, elements, &spec)?)
    }

    fn function(&self, name: &str, params: &[Param]) -> Result<View<Child>, DispatchError> {
        let args = params
            .iter()
            .filter(|p| p.default.is_none())
            .map(|p| Child::from(p.name.as_str()))
            .collect();
        let kwargs = params
            .iter()
            .filter_map(|p| p.default.map(|d| (Child::from(p.name.as_str()), Child::Value(d))))
            .collect();

        let args_spec =
            CollectionSpec::new("Positional Args [", "]", "Args").initial_mode(Mode::Compact);
        let kwargs_spec =
            CollectionSpec::new("Keyword Args {", "}", "Kwargs").initial_mode(Mode::Compact);
        let parts = vec![
            Child::from(switch_sequence(&self.options, args, &args_spec)?),
            Child::from(switch_key_values(&self.options, kwargs, &kwargs_spec)?),
        ];

        let header = format!("Function[{}]", name);
        let spec = CollectionSpec::new(format!("{} (", header), ")", header).vertical();
        Ok(switch_sequence(&self.options, parts, &spec)?)
    }

    fn module(
        &self,
        heap: &Heap,
        obj: ObjRef,
        name: &str,
        attrs: &[Attr],
    ) -> Result<View<Child>, DispatchError> {
        let pairs = readable(obj, attrs)
            .filter(|(_, value)| !matches!(heap.get(*value), Some(Value::Module { .. })))
            .map(|(attr, value)| (Child::from(attr.name.as_str()), Child::Value(value)))
            .collect();
        let header = format!("Module[{}]", name);
        let spec = CollectionSpec::new(format!("{} {{", header), "}", header);
        Ok(switch_key_values(&self.options, pairs, &spec)?)
    }

    fn class(
        &self,
        heap: &Heap,
        obj: ObjRef,
        name: &str,
        attrs: &[Attr],
    ) -> Result<View<Child>, DispatchError> {
        let (functions, fields): (Vec<_>, Vec<_>) = readable(obj, attrs)
            .map(|(attr, value)| (Child::from(attr.name.as_str()), Child::Value(value)))
            .partition(|(_, value)| match value {
                Child::Value(v) => matches!(heap.get(*v), Some(Value::Function { .. })),
                Child::View(_) => false,
            });

        let mut groups = Vec::new();
        for (label, pairs) in [("Functions", functions), ("Fields", fields)] {
            if pairs.is_empty() {
                continue;
            }
            let spec = CollectionSpec::new(format!("{} {{", label), "}", label)
                .initial_mode(Mode::Compact);
            groups.push(Child::from(switch_key_values(&self.options, pairs, &spec)?));
        }

        let header = format!("Class[{}]", name);
        let spec = CollectionSpec::new(format!("{} (", header), ")", header).vertical();
        Ok(switch_sequence(&self.options, groups, &spec)?)
    }

    fn object(
        &self,
        heap: &Heap,
        obj: ObjRef,
        class: ObjRef,
        attrs: &[Attr],
    ) -> Result<View<Child>, DispatchError> {
        let class_attrs: &[Attr] = match heap.get(class) {
            Some(Value::Class { attrs, .. }) => attrs,
            _ => &[],
        };

        let mut pairs = Vec::new();
        for (attr, value) in readable(obj, attrs) {
            if matches!(heap.get(value), Some(Value::Function { .. })) {
                continue;
            }
            if let Some(default) = class_attrs.iter().find(|a| a.name == attr.name) {
                let inherited = default
                    .value
                    .clone()
                    .and_then(|default| heap.try_eq(value, default));
                match inherited {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(err) => {
                        debug!(value = %obj, attr = %attr.name, error = %err, "skipping attribute");
                        continue;
                    }
                }
            }
            pairs.push((Child::from(attr.name.as_str()), Child::Value(value)));
        }

        let header = format!("Instance[{}]", heap.type_name(obj));
        let spec = CollectionSpec::new(format!("{} {{", header), "}", header).separator("=");
        Ok(switch_key_values(&self.options, pairs, &spec)?)
    }
}

/// Float text in Python `repr` form: `nan`, `-inf`, `1e+20`, `1.5e-07`, `2.0`.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Debug keeps the decimal point and switches to exponent form at the same
    // magnitudes repr does; only the exponent spelling differs.
    let text = format!("{:?}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// Public attributes whose lookup succeeded. Failures are logged and dropped.
fn readable(obj: ObjRef, attrs: &[Attr]) -> impl Iterator<Item = (&Attr, ObjRef)> {
    attrs
        .iter()
        .filter(|attr| attr.is_public())
        .filter_map(move |attr| match &attr.value {
            Ok(value) => Some((attr, *value)),
            Err(err) => {
                debug!(value = %obj, attr = %attr.name, error = %err, "skipping attribute");
                None
            }
        })
}

/// Every `Child::Value` in the view, including inside inline views.
fn value_refs(view: &View<Child>) -> Vec<ObjRef> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();
    let mut stack: Vec<&View<Child>> = vec![view];
    while let Some(view) = stack.pop() {
        // Push inline views in reverse so slot order is preserved.
        let mut inline = Vec::new();
        for child in view.children() {
            match child {
                Child::Value(obj) => {
                    if seen.insert(*obj) {
                        refs.push(*obj);
                    }
                }
                Child::View(inner) => inline.push(inner.as_ref()),
            }
        }
        stack.extend(inline.into_iter().rev());
    }
    refs
}

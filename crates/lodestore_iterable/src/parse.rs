//! Rebuilding nodes from serialized handle keys.

use lodestore_foundation::{
    EntityId, Error, ErrorContext, LinkId, PropertyId, PropertyValue, Result, SemanticLimit,
};

use crate::arena::QueryArena;
use crate::iterable::IterableId;
use crate::iterable_type::IterableType;

impl QueryArena {
    /// Rebuilds the node tree a key was produced from.
    ///
    /// Nodes are created through the ordinary constructors, so ids are
    /// validated against this arena's schema and existing nodes are reused.
    /// Numbers must be written without leading zeros, so the rebuilt node's
    /// key equals `key`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedHandle` if the key does not follow the handle
    /// grammar, `LimitExceeded` if it nests deeper than
    /// [`IterationConfig::max_nesting_depth`](crate::IterationConfig::max_nesting_depth),
    /// or any constructor error for ids the schema does not know.
    pub fn from_handle(&mut self, key: &str) -> Result<IterableId> {
        let mut parser = Parser {
            key,
            pos: 0,
            depth: 0,
        };
        let id = parser
            .node(self)
            .map_err(|e| e.with_frame(format!("parsing handle {key}")))?;
        if parser.pos != key.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(id)
    }
}

struct Parser<'k> {
    key: &'k str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::malformed_handle(self.key, self.pos, message)
    }

    fn rest(&self) -> &str {
        &self.key[self.pos..]
    }

    fn node(&mut self, arena: &mut QueryArena) -> Result<IterableId> {
        let limit = arena.config().max_nesting_depth;
        if self.depth == limit {
            return Err(
                Error::limit_exceeded(SemanticLimit::MaxNestingDepth { limit })
                    .with_context(ErrorContext::new().with_source(self.key)),
            );
        }
        self.depth += 1;
        let id = self.node_body(arena)?;
        self.depth -= 1;
        Ok(id)
    }

    fn node_body(&mut self, arena: &mut QueryArena) -> Result<IterableId> {
        let tag: u8 = self.number()?;
        let Some(iterable_type) = IterableType::from_id(tag) else {
            return Err(self.error("unknown type tag"));
        };

        match iterable_type {
            IterableType::Empty => arena.empty(),
            IterableType::AllEntities => {
                let entity_type = self.param()?;
                arena.all_entities(entity_type)
            }
            IterableType::SingleEntity => {
                let type_id = self.param()?;
                let local_id = self.param()?;
                arena.single_entity(EntityId::new(type_id, local_id))
            }
            IterableType::EntitiesWithLink => {
                let entity_type = self.param()?;
                let link = LinkId(self.param()?);
                arena.entities_with_link(entity_type, link)
            }
            IterableType::PropertyEquals => {
                let entity_type = self.param()?;
                let property = PropertyId(self.param()?);
                self.delimiter()?;
                let value = self.value()?;
                arena.property_equals(entity_type, property, value)
            }
            IterableType::FilterLinks => {
                let link = LinkId(self.param()?);
                self.delimiter()?;
                let source = self.node(arena)?;
                self.delimiter()?;
                let entities = self.node(arena)?;
                arena.filter_links(link, source, entities)
            }
            IterableType::CachedInstance => Err(self.error("cached instances have no key")),
        }
    }

    fn delimiter(&mut self) -> Result<()> {
        if self.rest().starts_with('-') {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error("expected '-'"))
        }
    }

    fn param<T: std::str::FromStr>(&mut self) -> Result<T> {
        self.delimiter()?;
        self.number()
    }

    /// Length of the digit run at the cursor. Fails on an empty run or a
    /// leading zero.
    fn digits(&self) -> Result<usize> {
        let len = self.rest().bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return Err(self.error("expected digits"));
        }
        if len > 1 && self.rest().starts_with('0') {
            return Err(self.error("leading zero"));
        }
        Ok(len)
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T> {
        let len = self.digits()?;
        let text = &self.key[self.pos..self.pos + len];
        let value = text.parse().map_err(|_| self.error("number out of range"))?;
        self.pos += len;
        Ok(value)
    }

    fn value(&mut self) -> Result<PropertyValue> {
        let Some(marker) = self.rest().chars().next() else {
            return Err(self.error("expected value"));
        };
        self.pos += marker.len_utf8();
        match marker {
            'b' => match self.rest().chars().next() {
                Some('0') => {
                    self.pos += 1;
                    Ok(PropertyValue::Bool(false))
                }
                Some('1') => {
                    self.pos += 1;
                    Ok(PropertyValue::Bool(true))
                }
                _ => Err(self.error("expected 0 or 1")),
            },
            'i' => {
                let negative = self.rest().starts_with('-');
                let start = self.pos;
                if negative {
                    self.pos += 1;
                }
                let len = self.digits()?;
                if negative && self.rest().starts_with('0') {
                    return Err(self.error("negative zero"));
                }
                let end = self.pos + len;
                let value = self.key[start..end]
                    .parse::<i64>()
                    .map_err(|_| self.error("integer out of range"))?;
                self.pos = end;
                Ok(PropertyValue::Int(value))
            }
            's' => {
                let len: usize = self.number()?;
                if !self.rest().starts_with(':') {
                    return Err(self.error("expected ':'"));
                }
                self.pos += 1;
                let end = self.pos.saturating_add(len);
                match self.key.get(self.pos..end) {
                    Some(text) => {
                        self.pos = end;
                        Ok(PropertyValue::from(text))
                    }
                    None => Err(self.error("string length out of bounds")),
                }
            }
            _ => {
                self.pos -= marker.len_utf8();
                Err(self.error("unknown value marker"))
            }
        }
    }
}

use async_trait::async_trait;
use bytes::Bytes;

use crate::client::Client;
use crate::codec::Codec;
use crate::commands::append::Append;
use crate::commands::decr::Decr;
use crate::commands::decrby::DecrBy;
use crate::commands::get::Get;
use crate::commands::getdel::GetDel;
use crate::commands::getex::GetEx;
use crate::commands::getrange::GetRange;
use crate::commands::getset::GetSet;
use crate::commands::incr::Incr;
use crate::commands::incrby::IncrBy;
use crate::commands::incrbyfloat::IncrByFloat;
use crate::commands::lcs::{Lcs, LcsIdx, LcsIdxWithMatchLen, LcsLen};
use crate::commands::mget::MGet;
use crate::commands::mset::MSet;
use crate::commands::msetnx::MSetNx;
use crate::commands::psetex::PSetEx;
use crate::commands::set::Set;
use crate::commands::setex::SetEx;
use crate::commands::setnx::SetNx;
use crate::commands::setrange::SetRange;
use crate::commands::strlen::StrLen;
use crate::commands::substr::SubStr;
use crate::commands::{Arg, Command, Erased};
use crate::context::Context;
use crate::frame::FrameKind;
use crate::value::Value;
use crate::Result;

type DynCommand = Box<dyn Command<Output = Value>>;

/// A batch of commands whose requests are all written before any reply is
/// read, amortizing round-trip latency.
///
/// Requests go out in push order and replies come back in the same order.
/// A server error reply becomes a [`Value::Error`] element in the result
/// list without failing the rest of the batch; I/O and protocol failures
/// abort it.
pub struct Pipeline<'a> {
    client: &'a Client,
    commands: Vec<DynCommand>,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(client: &'a Client) -> Pipeline<'a> {
        Pipeline {
            client,
            commands: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Executes the batch, consuming the pipeline.
    pub async fn exec(self, ctx: &Context) -> Result<Vec<Value>> {
        let batch = Batch {
            commands: self.commands,
        };
        self.client.exec(ctx, &batch).await
    }

    fn push<C>(&mut self, command: C) -> &mut Self
    where
        C: Command + 'static,
        C::Output: Into<Value>,
    {
        self.commands.push(Box::new(Erased(command)));
        self
    }

    pub fn get(&mut self, key: &str) -> &mut Self {
        self.push(Get {
            key: key.to_string(),
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<Bytes>, args: &[Arg]) -> &mut Self {
        self.push(Set {
            key: key.to_string(),
            value: value.into(),
            args: args.to_vec(),
        })
    }

    pub fn append(&mut self, key: &str, value: impl Into<Bytes>) -> &mut Self {
        self.push(Append {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn decr(&mut self, key: &str) -> &mut Self {
        self.push(Decr {
            key: key.to_string(),
        })
    }

    pub fn decr_by(&mut self, key: &str, decrement: i64) -> &mut Self {
        self.push(DecrBy {
            key: key.to_string(),
            decrement,
        })
    }

    pub fn get_del(&mut self, key: &str) -> &mut Self {
        self.push(GetDel {
            key: key.to_string(),
        })
    }

    pub fn get_ex(&mut self, key: &str, args: &[Arg]) -> &mut Self {
        self.push(GetEx {
            key: key.to_string(),
            args: args.to_vec(),
        })
    }

    pub fn get_range(&mut self, key: &str, start: i64, end: i64) -> &mut Self {
        self.push(GetRange {
            key: key.to_string(),
            start,
            end,
        })
    }

    pub fn get_set(&mut self, key: &str, value: impl Into<Bytes>) -> &mut Self {
        self.push(GetSet {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn incr(&mut self, key: &str) -> &mut Self {
        self.push(Incr {
            key: key.to_string(),
        })
    }

    pub fn incr_by(&mut self, key: &str, increment: i64) -> &mut Self {
        self.push(IncrBy {
            key: key.to_string(),
            increment,
        })
    }

    pub fn incr_by_float(&mut self, key: &str, increment: f64) -> &mut Self {
        self.push(IncrByFloat {
            key: key.to_string(),
            increment,
        })
    }

    pub fn lcs(&mut self, key1: &str, key2: &str, args: &[Arg]) -> &mut Self {
        self.push(Lcs {
            key1: key1.to_string(),
            key2: key2.to_string(),
            args: args.to_vec(),
        })
    }

    pub fn lcs_len(&mut self, key1: &str, key2: &str) -> &mut Self {
        self.push(LcsLen {
            key1: key1.to_string(),
            key2: key2.to_string(),
        })
    }

    pub fn lcs_idx(&mut self, key1: &str, key2: &str, args: &[Arg]) -> &mut Self {
        self.push(LcsIdx {
            key1: key1.to_string(),
            key2: key2.to_string(),
            args: args.to_vec(),
        })
    }

    pub fn lcs_idx_with_match_len(&mut self, key1: &str, key2: &str, args: &[Arg]) -> &mut Self {
        self.push(LcsIdxWithMatchLen {
            key1: key1.to_string(),
            key2: key2.to_string(),
            args: args.to_vec(),
        })
    }

    pub fn mget(&mut self, keys: &[&str]) -> &mut Self {
        self.push(MGet {
            keys: keys.iter().map(|key| key.to_string()).collect(),
        })
    }

    pub fn mset(&mut self, pairs: &[(&str, &[u8])]) -> &mut Self {
        self.push(MSet {
            pairs: owned_pairs(pairs),
        })
    }

    pub fn mset_nx(&mut self, pairs: &[(&str, &[u8])]) -> &mut Self {
        self.push(MSetNx {
            pairs: owned_pairs(pairs),
        })
    }

    pub fn pset_ex(&mut self, key: &str, value: impl Into<Bytes>, milliseconds: u64) -> &mut Self {
        self.push(PSetEx {
            key: key.to_string(),
            value: value.into(),
            milliseconds,
        })
    }

    pub fn set_ex(&mut self, key: &str, value: impl Into<Bytes>, seconds: u64) -> &mut Self {
        self.push(SetEx {
            key: key.to_string(),
            value: value.into(),
            seconds,
        })
    }

    pub fn set_nx(&mut self, key: &str, value: impl Into<Bytes>) -> &mut Self {
        self.push(SetNx {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn set_range(&mut self, key: &str, offset: u64, value: impl Into<Bytes>) -> &mut Self {
        self.push(SetRange {
            key: key.to_string(),
            offset,
            value: value.into(),
        })
    }

    pub fn str_len(&mut self, key: &str) -> &mut Self {
        self.push(StrLen {
            key: key.to_string(),
        })
    }

    pub fn sub_str(&mut self, key: &str, start: i64, end: i64) -> &mut Self {
        self.push(SubStr {
            key: key.to_string(),
            start,
            end,
        })
    }
}

pub(crate) fn owned_pairs(pairs: &[(&str, &[u8])]) -> Vec<(String, Bytes)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Bytes::copy_from_slice(value)))
        .collect()
}

/// The pipeline's command-shaped core: serialize every child, then parse
/// every child.
struct Batch {
    commands: Vec<DynCommand>,
}

#[async_trait]
impl Command for Batch {
    type Output = Vec<Value>;

    async fn serialize(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<()> {
        for command in &self.commands {
            command.serialize(codec, ctx).await?;
        }
        Ok(())
    }

    async fn parse(&self, codec: &mut Codec<'_>, ctx: &Context) -> Result<Self::Output> {
        let mut results = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            // The server answers every pipelined request, so a per-command
            // error is an element of the result, not a batch failure.
            if codec.peek_type(ctx).await? == FrameKind::Error {
                results.push(Value::Error(codec.read_error(ctx).await?));
                continue;
            }
            results.push(command.parse(codec, ctx).await?);
        }
        Ok(results)
    }
}

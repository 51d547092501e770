//! Build hosts: turn a [`RenderedUnit`] into callable encode/decode functions.

use crate::error::Error;
use crate::members::Accessor;
use crate::reflect::{Flat, Reflect};
use crate::render::{Op, RenderedUnit, SizeOp};
use crate::strategy::{AddressMode, StringEncoding};
use crate::wire::{self, Cursor};
use crate::{verify_arg, Result};

type SizeFn<T> = Box<dyn Fn(&T) -> Result<usize> + Send + Sync>;
type WriteFn<T> = Box<dyn Fn(&T, &mut [u8]) -> Result<usize> + Send + Sync>;
type ReadFn<T> = Box<dyn Fn(&[u8]) -> Result<(T, usize)> + Send + Sync>;

type SizeStep<T> = Box<dyn Fn(&T) -> Result<usize> + Send + Sync>;
type WriteStep<T> = Box<dyn Fn(&T, &mut [u8], &mut Cursor) -> Result<()> + Send + Sync>;
type ReadStep<T> = Box<dyn Fn(&mut T, &[u8], &mut Cursor) -> Result<()> + Send + Sync>;

/// Compiles rendered units. This is the only place codec construction depends
/// on a facility outside the planner.
pub trait BuildHost: Send + Sync + 'static {
    /// Builds the codec for `unit`. `accessors` are indexed by the slots the
    /// unit's program refers to.
    fn build<T: Flat>(&self, unit: &RenderedUnit, accessors: &[Accessor<T>])
    -> Result<CompiledCodec<T>>;
}

/// The encode/decode callables produced by a [`BuildHost`].
pub struct CompiledCodec<T> {
    size: SizeFn<T>,
    write: WriteFn<T>,
    read: ReadFn<T>,
}

impl<T> CompiledCodec<T> {
    pub fn new(
        size: impl Fn(&T) -> Result<usize> + Send + Sync + 'static,
        write: impl Fn(&T, &mut [u8]) -> Result<usize> + Send + Sync + 'static,
        read: impl Fn(&[u8]) -> Result<(T, usize)> + Send + Sync + 'static,
    ) -> CompiledCodec<T> {
        CompiledCodec {
            size: Box::new(size),
            write: Box::new(write),
            read: Box::new(read),
        }
    }

    /// Exact encoded size of `value`.
    pub fn size(&self, value: &T) -> Result<usize> {
        (self.size)(value)
    }

    /// Writes `value` at the start of `buffer` and returns the bytes written.
    pub fn write(&self, value: &T, buffer: &mut [u8]) -> Result<usize> {
        (self.write)(value, buffer)
    }

    /// Reads a value from the start of `buffer` and returns it with the bytes consumed.
    pub fn read(&self, buffer: &[u8]) -> Result<(T, usize)> {
        (self.read)(buffer)
    }

    pub fn encode(&self, value: &T) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.size(value)?];
        let written = self.write(value, &mut buffer)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    /// Appends the encoding of `value` to `sink`. On failure `sink` is left as it was.
    pub fn encode_into(&self, value: &T, sink: &mut Vec<u8>) -> Result<usize> {
        let start = sink.len();
        sink.resize(start + self.size(value)?, 0);
        match self.write(value, &mut sink[start..]) {
            Ok(written) => {
                sink.truncate(start + written);
                Ok(written)
            }
            Err(e) => {
                sink.truncate(start);
                Err(e)
            }
        }
    }

    pub fn decode(&self, buffer: &[u8]) -> Result<T> {
        self.read(buffer).map(|(value, _)| value)
    }
}

/// Compiles a program into one boxed closure per op, specialized for the
/// addressing mode, the member kind and the member accessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosureHost;

impl BuildHost for ClosureHost {
    fn build<T: Flat>(
        &self,
        unit: &RenderedUnit,
        accessors: &[Accessor<T>],
    ) -> Result<CompiledCodec<T>> {
        let program = &unit.program;
        verify_arg!(accessors, accessors.len() == program.slots);
        let accessor = |slot: usize| {
            accessors.get(slot).copied().ok_or_else(|| {
                Error::build_failed(
                    unit.type_name.clone(),
                    format!("op refers to slot {slot} of {}", accessors.len()),
                )
            })
        };

        let encoding = unit.strategy.strings;
        let raw = unit.strategy.address == AddressMode::Raw;

        let sizes = program
            .size
            .iter()
            .map(|term| {
                let slot = match term {
                    SizeOp::Presence { slot, .. }
                    | SizeOp::Text { slot, .. }
                    | SizeOp::Elements { slot, .. } => *slot,
                };
                Ok(size_step(*term, accessor(slot)?, encoding))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut writes = Vec::with_capacity(program.ops.len());
        let mut reads = Vec::with_capacity(program.ops.len());
        for op in &program.ops {
            match op.slot() {
                None => {
                    writes.push(write_step(*op, None, raw, encoding));
                    reads.push(read_step(*op, None, raw, encoding));
                }
                Some(slot) => {
                    let accessor = accessor(slot)?;
                    writes.push(write_step(*op, Some(accessor), raw, encoding));
                    reads.push(read_step(*op, Some(accessor), raw, encoding));
                }
            }
        }

        let fixed_size = program.fixed_size;
        Ok(CompiledCodec::new(
            move |value: &T| {
                let mut size = fixed_size;
                for step in &sizes {
                    size += step(value)?;
                }
                Ok(size)
            },
            move |value: &T, buffer: &mut [u8]| {
                let mut cursor = Cursor::new();
                for step in &writes {
                    step(value, buffer, &mut cursor)?;
                }
                Ok(cursor.position())
            },
            move |buffer: &[u8]| {
                let mut cursor = Cursor::new();
                let mut value = T::default();
                for step in &reads {
                    step(&mut value, buffer, &mut cursor)?;
                }
                Ok((value, cursor.position()))
            },
        ))
    }
}

fn size_step<T: Flat>(
    term: SizeOp,
    accessor: Accessor<T>,
    encoding: StringEncoding,
) -> SizeStep<T> {
    let get = accessor.get;
    match term {
        SizeOp::Presence { member, width, .. } => Box::new(move |value: &T| {
            let mut len = 0;
            get(value, &mut |v: &dyn Reflect| {
                len = wire::presence_len(v, member, width)?;
                Ok(())
            })?;
            Ok(len)
        }),
        SizeOp::Text {
            member,
            nullable,
            ..
        } => Box::new(move |value: &T| {
            let mut len = 0;
            get(value, &mut |v: &dyn Reflect| {
                len = wire::text_len(v, member, nullable, encoding)?;
                Ok(())
            })?;
            Ok(len)
        }),
        SizeOp::Elements {
            member,
            width,
            nullable,
            ..
        } => Box::new(move |value: &T| {
            let mut len = 0;
            get(value, &mut |v: &dyn Reflect| {
                len = wire::elements_len(v, member, nullable, width)?;
                Ok(())
            })?;
            Ok(len)
        }),
    }
}

fn write_step<T: Flat>(
    op: Op,
    accessor: Option<Accessor<T>>,
    raw: bool,
    encoding: StringEncoding,
) -> WriteStep<T> {
    let Some(Accessor { get, .. }) = accessor else {
        return match op {
            Op::Guard { member, bytes } => {
                Box::new(move |_: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                    cursor.guard(buffer.len(), bytes, member)
                })
            }
            _ => Box::new(|_: &T, _: &mut [u8], _: &mut Cursor| Ok(())),
        };
    };
    match op {
        Op::Guard { member, bytes } => {
            Box::new(move |_: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                cursor.guard(buffer.len(), bytes, member)
            })
        }
        Op::Scalar { member, width, .. } if raw => {
            Box::new(move |value: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                get(value, &mut |v: &dyn Reflect| {
                    // SAFETY: the program places a guard covering this op's run.
                    unsafe { wire::raw::write_scalar(buffer, cursor, member, v, width) }
                })
            })
        }
        Op::Scalar { member, width, .. } => {
            Box::new(move |value: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                get(value, &mut |v: &dyn Reflect| {
                    wire::checked::write_scalar(buffer, cursor, member, v, width)
                })
            })
        }
        Op::Flagged { member, width, .. } => {
            let write = if raw {
                wire::raw::write_flagged
            } else {
                wire::checked::write_flagged
            };
            Box::new(move |value: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                get(value, &mut |v: &dyn Reflect| write(buffer, cursor, member, v, width))
            })
        }
        Op::Text {
            member,
            nullable,
            ..
        } => {
            let write = if raw {
                wire::raw::write_text
            } else {
                wire::checked::write_text
            };
            Box::new(move |value: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                get(value, &mut |v: &dyn Reflect| {
                    write(buffer, cursor, member, v, nullable, encoding)
                })
            })
        }
        Op::Elements {
            member,
            width,
            nullable,
            ..
        } => {
            let write = if raw {
                wire::raw::write_elements
            } else {
                wire::checked::write_elements
            };
            Box::new(move |value: &T, buffer: &mut [u8], cursor: &mut Cursor| {
                get(value, &mut |v: &dyn Reflect| write(buffer, cursor, member, v, nullable, width))
            })
        }
    }
}

fn read_step<T: Flat>(
    op: Op,
    accessor: Option<Accessor<T>>,
    raw: bool,
    encoding: StringEncoding,
) -> ReadStep<T> {
    let Some(Accessor { set, .. }) = accessor else {
        return match op {
            Op::Guard { member, bytes } => {
                Box::new(move |_: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                    cursor.guard(buffer.len(), bytes, member)
                })
            }
            _ => Box::new(|_: &mut T, _: &[u8], _: &mut Cursor| Ok(())),
        };
    };
    match op {
        Op::Guard { member, bytes } => {
            Box::new(move |_: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                cursor.guard(buffer.len(), bytes, member)
            })
        }
        Op::Scalar { member, width, .. } if raw => {
            Box::new(move |value: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                set(value, &mut |slot: &mut dyn Reflect| {
                    // SAFETY: the program places a guard covering this op's run.
                    unsafe { wire::raw::read_scalar(buffer, cursor, member, slot, width) }
                })
            })
        }
        Op::Scalar { member, width, .. } => {
            Box::new(move |value: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                set(value, &mut |slot: &mut dyn Reflect| {
                    wire::checked::read_scalar(buffer, cursor, member, slot, width)
                })
            })
        }
        Op::Flagged { member, width, .. } => {
            let read = if raw {
                wire::raw::read_flagged
            } else {
                wire::checked::read_flagged
            };
            Box::new(move |value: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                set(value, &mut |slot: &mut dyn Reflect| read(buffer, cursor, member, slot, width))
            })
        }
        Op::Text {
            member,
            nullable,
            ..
        } => {
            let read = if raw {
                wire::raw::read_text
            } else {
                wire::checked::read_text
            };
            Box::new(move |value: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                set(value, &mut |slot: &mut dyn Reflect| {
                    read(buffer, cursor, member, slot, nullable, encoding)
                })
            })
        }
        Op::Elements {
            member,
            width,
            nullable,
            ..
        } => {
            let read = if raw {
                wire::raw::read_elements
            } else {
                wire::checked::read_elements
            };
            Box::new(move |value: &mut T, buffer: &[u8], cursor: &mut Cursor| {
                set(value, &mut |slot: &mut dyn Reflect| {
                    read(buffer, cursor, member, slot, nullable, width)
                })
            })
        }
    }
}

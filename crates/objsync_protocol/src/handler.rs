//! Applying decoded instructions.

use crate::changeset::Changeset;
use crate::instruction::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Clear, CreateObject,
    EraseColumn, EraseObject, EraseTable, Instruction, SetErase, SetInsert, Update,
};
use std::convert::Infallible;

/// Receives the instructions of a changeset in order.
///
/// Every method defaults to doing nothing, so implementers only override the
/// kinds they care about. The changeset is passed along to resolve interned
/// strings and buffer ranges.
#[allow(unused_variables)]
pub trait InstructionHandler {
    /// Error returned to abort application.
    type Error;

    /// Handles [`AddTable`].
    fn add_table(&mut self, cs: &Changeset, instr: &AddTable) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`EraseTable`].
    fn erase_table(&mut self, cs: &Changeset, instr: &EraseTable) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`AddColumn`].
    fn add_column(&mut self, cs: &Changeset, instr: &AddColumn) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`EraseColumn`].
    fn erase_column(&mut self, cs: &Changeset, instr: &EraseColumn) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`CreateObject`].
    fn create_object(&mut self, cs: &Changeset, instr: &CreateObject) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`EraseObject`].
    fn erase_object(&mut self, cs: &Changeset, instr: &EraseObject) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`Update`].
    fn update(&mut self, cs: &Changeset, instr: &Update) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`AddInteger`].
    fn add_integer(&mut self, cs: &Changeset, instr: &AddInteger) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`ArrayInsert`].
    fn array_insert(&mut self, cs: &Changeset, instr: &ArrayInsert) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`ArrayMove`].
    fn array_move(&mut self, cs: &Changeset, instr: &ArrayMove) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`ArrayErase`].
    fn array_erase(&mut self, cs: &Changeset, instr: &ArrayErase) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`Clear`].
    fn clear(&mut self, cs: &Changeset, instr: &Clear) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`SetInsert`].
    fn set_insert(&mut self, cs: &Changeset, instr: &SetInsert) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handles [`SetErase`].
    fn set_erase(&mut self, cs: &Changeset, instr: &SetErase) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Handler that accepts everything and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInstructionHandler;

impl InstructionHandler for NullInstructionHandler {
    type Error = Infallible;
}

/// Feeds every instruction of `changeset` to `handler`, in order.
///
/// # Errors
///
/// Stops at and returns the first handler error.
pub fn apply_changeset<H>(changeset: &Changeset, handler: &mut H) -> Result<(), H::Error>
where
    H: InstructionHandler + ?Sized,
{
    for instr in changeset {
        match instr {
            Instruction::AddTable(i) => handler.add_table(changeset, i)?,
            Instruction::EraseTable(i) => handler.erase_table(changeset, i)?,
            Instruction::AddColumn(i) => handler.add_column(changeset, i)?,
            Instruction::EraseColumn(i) => handler.erase_column(changeset, i)?,
            Instruction::CreateObject(i) => handler.create_object(changeset, i)?,
            Instruction::EraseObject(i) => handler.erase_object(changeset, i)?,
            Instruction::Update(i) => handler.update(changeset, i)?,
            Instruction::AddInteger(i) => handler.add_integer(changeset, i)?,
            Instruction::ArrayInsert(i) => handler.array_insert(changeset, i)?,
            Instruction::ArrayMove(i) => handler.array_move(changeset, i)?,
            Instruction::ArrayErase(i) => handler.array_erase(changeset, i)?,
            Instruction::Clear(i) => handler.clear(changeset, i)?,
            Instruction::SetInsert(i) => handler.set_insert(changeset, i)?,
            Instruction::SetErase(i) => handler.set_erase(changeset, i)?,
        }
    }
    Ok(())
}

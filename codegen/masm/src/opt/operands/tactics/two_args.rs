use super::*;

/// This tactic is for specifically optimising binary operators, especially those which are
/// commutative.  The best case scenario for commutative ops is no work needs to be done.
/// Otherwise binary ops may be solved with a single swap, move or dupe, and at worst two swaps,
/// moves or dupes.
///
/// The only criterion for success is an arity of exactly two.  Then the solution will always
/// succeed, adjusted only by whether commutativity is a factor.

#[derive(Default)]
pub struct TwoArgs;

impl Tactic for TwoArgs {
    fn apply(&mut self, builder: &mut SolutionBuilder) -> TacticResult {
        if builder.arity() != 2 {
            return Err(TacticError::PreconditionFailed);
        }

        let rhs = builder.unwrap_expected(0);
        let rhs_un = rhs.unaliased();
        let mut rhs_is_copy = builder.context.copies().has_copies(&rhs_un);

        let lhs = builder.unwrap_expected(1);
        let lhs_un = lhs.unaliased();
        let mut lhs_is_copy = builder.context.copies().has_copies(&lhs_un);

        let positions = if lhs_un != rhs_un {
            // Values are distinct; just find them individually.
            builder.get_current_position(&lhs_un).and_then(|lhs_pos| {
                builder.get_current_position(&rhs_un).map(|rhs_pos| (lhs_pos, rhs_pos))
            })
        } else if lhs_is_copy {
            // We are given the same value, but one or both is a copy.  Need to check which is an
            // alias.
            lhs_is_copy = lhs.is_alias();
            rhs_is_copy = rhs.is_alias();

            // Return the same position for both.
            builder.get_current_position(&lhs_un).map(|pos| (pos, pos))
        } else {
            // We are given the same value, but they're not copies, implying they have different
            // positions.  I.e., literally the same value twice in the input.
            builder.get_current_position(&lhs_un).and_then(|lhs_pos| {
                builder
                    .get_current_position_skip(lhs_pos + 1, &lhs_un)
                    .map(|rhs_pos| (lhs_pos, rhs_pos))
            })
        };

        if let Some((lhs_pos, rhs_pos)) = positions {
            match (lhs_is_copy, rhs_is_copy) {
                (true, true) => self.copy_copy(builder, lhs, lhs_pos, rhs, rhs_pos),
                (true, false) => self.copy_move(builder, lhs, lhs_pos, rhs, rhs_pos),
                (false, true) => self.move_copy(builder, lhs, lhs_pos, rhs, rhs_pos),
                (false, false) => self.move_move(builder, lhs, lhs_pos, rhs, rhs_pos),
            }
        } else {
            Err(TacticError::NotApplicable)
        }
    }
}

impl TwoArgs {
    fn copy_copy(
        &mut self,
        builder: &mut SolutionBuilder,
        lhs: ValueOrAlias,
        lhs_pos: u8,
        rhs: ValueOrAlias,
        rhs_pos: u8,
    ) -> TacticResult {
        if lhs_pos == rhs_pos {
            // Copy it twice.  The scheduler will be requesting a dupe of the dupe.
            builder.dup(lhs_pos, lhs.unwrap_alias());
            let first_copy_alias_id = builder.stack()[0].unwrap_alias();
            let next_copy_alias_id = first_copy_alias_id.checked_add(1).unwrap();
            builder.dup(0, next_copy_alias_id);
        } else {
            builder.dup(lhs_pos, lhs.unwrap_alias());
            builder.dup(rhs_pos + 1, rhs.unwrap_alias());
        }

        Ok(())
    }

    fn copy_move(
        &mut self,
        builder: &mut SolutionBuilder,
        lhs: ValueOrAlias,
        lhs_pos: u8,
        _rhs: ValueOrAlias,
        rhs_pos: u8,
    ) -> TacticResult {
        builder.dup(lhs_pos, lhs.unwrap_alias());

        // We don't need to move the RHS if it was on top already and either LHS is the same value
        // or we can leave the operands out of order.
        let dupe_of_top = lhs_pos == rhs_pos && lhs_pos == 0;
        let can_leave_rhs = builder.unordered_allowed() && rhs_pos == 0;

        if !can_leave_rhs && !dupe_of_top {
            builder.movup(rhs_pos + 1);
        }

        Ok(())
    }

    fn move_copy(
        &mut self,
        builder: &mut SolutionBuilder,
        _lhs: ValueOrAlias,
        lhs_pos: u8,
        rhs: ValueOrAlias,
        rhs_pos: u8,
    ) -> TacticResult {
        if lhs_pos == 0 {
            builder.dup(rhs_pos, rhs.unwrap_alias());
        } else {
            builder.movup(lhs_pos);
            if lhs_pos < rhs_pos {
                builder.dup(rhs_pos, rhs.unwrap_alias());
            } else if lhs_pos == rhs_pos {
                builder.dup(0, rhs.unwrap_alias());
            } else {
                builder.dup(rhs_pos + 1, rhs.unwrap_alias());
            }
        }

        Ok(())
    }

    fn move_move(
        &mut self,
        builder: &mut SolutionBuilder,
        _lhs: ValueOrAlias,
        lhs_pos: u8,
        _rhs: ValueOrAlias,
        rhs_pos: u8,
    ) -> TacticResult {
        assert!(lhs_pos != rhs_pos);

        if lhs_pos == 0 {
            // Just move the RHS to the top, if needed.
            if !(builder.unordered_allowed() && rhs_pos == 1) {
                builder.movup(rhs_pos);
            }
        } else if rhs_pos == 0 && builder.unordered_allowed() {
            // Just move the LHS to the top.
            builder.movup(lhs_pos);
        } else if rhs_pos >= 2 && lhs_pos == 1 {
            // Swap the RHS up to the top.
            builder.swap(rhs_pos);
        } else if (rhs_pos == 1 && lhs_pos == 2)
            || (builder.unordered_allowed() && lhs_pos == 1 && rhs_pos == 2)
        {
            // Can just move the top value out of the way.
            builder.movdn(2);
        } else {
            // Default solution of moving them both.
            builder.movup(lhs_pos);
            if lhs_pos < rhs_pos {
                builder.movup(rhs_pos);
            } else {
                builder.movup(rhs_pos + 1);
            }
        }

        Ok(())
    }
}

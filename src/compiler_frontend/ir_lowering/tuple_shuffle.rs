//! Tuple Shuffles
//!
//! Reshapes source values into a destination tuple type. Each destination field
//! takes its value from a source element, from its default value expression, or
//! (for a trailing variadic field) from an array packed out of the remaining
//! source elements.
//!
//! Argument lists are tuples, so this is also how default arguments and
//! variadic arguments reach a call.

use crate::backends::ir::ir_nodes::IrValue;
use crate::compiler_frontend::ast::ast_nodes::TextLocation;
use crate::compiler_frontend::ast::expression::{Expression, ShuffleEntry};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::{DataType, TupleField};
use crate::compiler_frontend::ir_lowering::function_lowerer::FunctionLowerer;
use crate::compiler_frontend::ir_lowering::managed_value::ManagedValue;
use crate::return_invariant_error;
use crate::settings::TUPLE_ELEMENTS_CAPACITY;

/// Mapping for promoting one scalar into `fields`.
///
/// The scalar fills `scalar_field`, a trailing variadic field starts the
/// variadic section and every other field takes its default.
pub fn scalar_to_tuple_mapping(fields: &[TupleField], scalar_field: usize) -> Vec<ShuffleEntry> {
    let mut mapping = Vec::with_capacity(fields.len() + 1);

    for (index, field) in fields.iter().enumerate() {
        if index == scalar_field {
            if field.is_variadic {
                mapping.push(ShuffleEntry::VariadicStart);
            }
            mapping.push(ShuffleEntry::FromSource(0));
            continue;
        }

        if field.is_variadic {
            mapping.push(ShuffleEntry::VariadicStart);
            break;
        }

        mapping.push(ShuffleEntry::UseDefault);
    }

    mapping
}

impl<'a> FunctionLowerer<'a> {
    /// Builds a `destination` tuple out of owned `sources`.
    ///
    /// Every `FromSource` entry consumes one +1 reference of the element it names,
    /// so the caller must own one reference per use.
    pub(crate) fn emit_tuple_shuffle(
        &mut self,
        location: TextLocation,
        destination: &DataType,
        sources: &[IrValue],
        mapping: &[ShuffleEntry],
        variadic_injection: Option<&Expression>,
    ) -> Result<ManagedValue, CompilerError> {
        let elements = self.emit_shuffle_elements(
            location,
            destination,
            sources,
            mapping,
            variadic_injection,
        )?;

        let tuple = self
            .builder
            .create_tuple(location, destination.clone(), &elements);

        Ok(self.managed_rvalue_with_cleanup(tuple))
    }

    /// The owned field values of a `destination` tuple, in field order.
    ///
    /// Calls pass these as individual arguments instead of building the tuple.
    pub(crate) fn emit_shuffle_elements(
        &mut self,
        location: TextLocation,
        destination: &DataType,
        sources: &[IrValue],
        mapping: &[ShuffleEntry],
        variadic_injection: Option<&Expression>,
    ) -> Result<Vec<IrValue>, CompilerError> {
        let Some(fields) = destination.tuple_fields() else {
            return_invariant_error!(
                "Tuple shuffle into a type that is not a tuple",
                location,
                { FoundType => destination.to_string() }
            );
        };

        let mut entries = mapping.iter();
        let mut elements = Vec::with_capacity(TUPLE_ELEMENTS_CAPACITY);

        for (field_index, field) in fields.iter().enumerate() {
            let Some(entry) = entries.next() else {
                return_invariant_error!(
                    format!(
                        "Shuffle mapping has {} entries for {} fields",
                        mapping.len(),
                        fields.len()
                    ),
                    location
                );
            };

            match *entry {
                ShuffleEntry::FromSource(source_index) => {
                    elements.push(source_value(sources, source_index, location)?.clone());
                }

                ShuffleEntry::UseDefault => {
                    let Some(default_value) = &field.default_value else {
                        return_invariant_error!(
                            format!("Tuple field {field_index} has no default value"),
                            location
                        );
                    };

                    let value = self.lower_expression(default_value)?;
                    elements.push(self.forward(value, default_value.location)?);
                }

                ShuffleEntry::VariadicStart => {
                    let Some(base_type) = field.variadic_base_type() else {
                        return_invariant_error!(
                            format!(
                                "Variadic arguments mapped onto non-variadic field {field_index}"
                            ),
                            location
                        );
                    };

                    if field_index + 1 != fields.len() {
                        return_invariant_error!("Variadic field is not the last field", location);
                    }

                    let Some(injection) = variadic_injection else {
                        return_invariant_error!(
                            "Variadic tuple shuffle has no array injection function",
                            location
                        );
                    };

                    // Everything after the variadic start feeds the array
                    let mut variadic_values = Vec::with_capacity(entries.len());
                    for entry in entries.by_ref() {
                        let ShuffleEntry::FromSource(source_index) = *entry else {
                            return_invariant_error!(
                                "Only source elements may follow the variadic start",
                                location
                            );
                        };
                        let value = source_value(sources, source_index, location)?;
                        variadic_values.push(value.clone());
                    }

                    let array =
                        self.emit_variadic_array(location, base_type, &variadic_values, injection)?;
                    elements.push(array);
                }
            }
        }

        if entries.next().is_some() {
            return_invariant_error!(
                format!(
                    "Shuffle mapping has {} entries for {} fields",
                    mapping.len(),
                    fields.len()
                ),
                location
            );
        }

        Ok(elements)
    }

    /// Packs owned `values` into a fresh array and returns the owned array value.
    fn emit_variadic_array(
        &mut self,
        location: TextLocation,
        base_type: &DataType,
        values: &[IrValue],
        injection: &Expression,
    ) -> Result<IrValue, CompilerError> {
        let count = self
            .builder
            .create_integer_value(location, values.len() as u64);
        let (object, base) = self
            .builder
            .create_alloc_array(location, base_type.clone(), &count);

        for (index, value) in values.iter().enumerate() {
            if index == 0 {
                self.builder.create_store(location, value, &base);
                continue;
            }

            let slot = self
                .builder
                .create_index_addr(location, &base, index as u64);
            self.builder.create_store(location, value, &slot);
        }

        let array = self.emit_array_injection_call(location, object, base, count, injection)?;
        self.forward(array, location)
    }

    /// Shuffles the elements of an existing tuple value.
    pub(crate) fn lower_tuple_shuffle(
        &mut self,
        expr: &Expression,
        sub: &Expression,
        mapping: &[ShuffleEntry],
        variadic_injection: Option<&Expression>,
    ) -> Result<ManagedValue, CompilerError> {
        let location = expr.location;

        let Some(source_fields) = sub.data_type.tuple_fields() else {
            return_invariant_error!(
                "Tuple shuffle source is not a tuple value",
                location,
                { FoundType => sub.data_type.to_string() }
            );
        };

        // One retain per use keeps duplicated and dropped elements balanced
        let mut uses = vec![0usize; source_fields.len()];
        for entry in mapping {
            if let ShuffleEntry::FromSource(index) = entry {
                if let Some(count) = uses.get_mut(*index) {
                    *count += 1;
                }
            }
        }

        let source = self.lower_expression(sub)?;
        let mut elements = Vec::with_capacity(source_fields.len());
        for (index, field) in source_fields.iter().enumerate() {
            let element = self.builder.create_extract(
                location,
                source.value(),
                index,
                field.data_type.clone(),
            );
            for _ in 0..uses[index] {
                self.emit_retain_rvalue(location, &element);
            }
            elements.push(element);
        }

        self.emit_tuple_shuffle(
            location,
            &expr.data_type,
            &elements,
            mapping,
            variadic_injection,
        )
    }

    /// Promotes a single value into a tuple, filling the other fields with
    /// their defaults and an empty variadic array.
    pub(crate) fn lower_scalar_to_tuple(
        &mut self,
        expr: &Expression,
        sub: &Expression,
        scalar_field: usize,
        variadic_injection: Option<&Expression>,
    ) -> Result<ManagedValue, CompilerError> {
        let elements =
            self.lower_scalar_to_tuple_elements(expr, sub, scalar_field, variadic_injection)?;

        let tuple = self
            .builder
            .create_tuple(expr.location, expr.data_type.clone(), &elements);

        Ok(self.managed_rvalue_with_cleanup(tuple))
    }

    /// The owned field values of a scalar promotion, without the tuple around them.
    pub(crate) fn lower_scalar_to_tuple_elements(
        &mut self,
        expr: &Expression,
        sub: &Expression,
        scalar_field: usize,
        variadic_injection: Option<&Expression>,
    ) -> Result<Vec<IrValue>, CompilerError> {
        let location = expr.location;

        let Some(fields) = expr.data_type.tuple_fields() else {
            return_invariant_error!(
                "Scalar promoted into a type that is not a tuple",
                location,
                { FoundType => expr.data_type.to_string() }
            );
        };

        if scalar_field >= fields.len() {
            return_invariant_error!(
                format!(
                    "Scalar promoted into field {scalar_field} of a {} field tuple",
                    fields.len()
                ),
                location
            );
        }

        let mapping = scalar_to_tuple_mapping(fields, scalar_field);

        let scalar = self.lower_expression(sub)?;
        let scalar = self.forward(scalar, sub.location)?;

        self.emit_shuffle_elements(
            location,
            &expr.data_type,
            &[scalar],
            &mapping,
            variadic_injection,
        )
    }
}

fn source_value(
    sources: &[IrValue],
    index: usize,
    location: TextLocation,
) -> Result<&IrValue, CompilerError> {
    match sources.get(index) {
        Some(value) => Ok(value),
        None => return_invariant_error!(
            format!(
                "Shuffle source index {index} is out of range for {} values",
                sources.len()
            ),
            location
        ),
    }
}

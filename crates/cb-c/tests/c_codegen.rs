//! End-to-end C rendering: typed declarations, typedefs, initializers and
//! the main function wrapper.

use cb_core::{Block, BracesMode, File, FnCall, PlainValue, Result, Type, Value};
use cb_c::CBackend;
use pretty_assertions::assert_eq;

fn c() -> CBackend {
    CBackend::new()
}

#[test]
fn struct_field_access_on_a_foreign_function_result() -> Result<()> {
    let block = Block::naming();
    block.set_braces_mode(BracesMode::Never)?;

    let call = FnCall::named("some_foreign_function", vec![]);
    let call_result = call.res().value();

    let result_ty = Type::struct_of(vec![]);
    result_ty.set_external_type_name("ForeignFunctionResultStruct");
    result_ty.add_field("innerIntValueKey", Type::int())?;
    call_result.set_type(&result_ty);

    let result_var = call_result.assign_to_new_var();
    block.add_var(&result_var)?;
    result_var.set_name("foreign_function_result")?;

    let inner_int_var = result_var
        .ref_val()
        .value_for_key("innerIntValueKey")?
        .assign_to_new_var();
    block.add_var(&inner_int_var)?;
    inner_int_var.set_name("innerIntValue")?;

    let expected = "\
const ForeignFunctionResultStruct foreign_function_result = some_foreign_function();
const int innerIntValue = foreign_function_result.innerIntValueKey;";
    assert_eq!(block.build(&c())?, expected);
    Ok(())
}

#[test]
fn named_struct_types_render_as_typedefs() -> Result<()> {
    let file = File::new();

    let point_ty = Type::struct_of(vec![
        ("x".to_string(), Type::int()),
        ("y".to_string(), Type::int()),
    ]);
    point_ty.set_type_name("Point")?;
    file.add_type(&point_ty)?;

    let expected = "typedef struct _Point {
    int x;
    int y;
} Point;
";
    assert_eq!(file.build(&c())?, expected);
    Ok(())
}

#[test]
fn top_level_statements_are_wrapped_into_main() -> Result<()> {
    let file = File::new();

    let message_var = Value::string("hi").assign_to_new_var();
    file.add_var(&message_var)?;
    message_var.set_name("message")?;

    let expected = "int main()
{
    const char* message = \"hi\";

    return 0;
}
";
    assert_eq!(file.build(&c())?, expected);
    Ok(())
}

#[test]
fn list_variables_get_an_array_suffix() -> Result<()> {
    let block = Block::naming();
    block.set_braces_mode(BracesMode::Never)?;

    let data = PlainValue::List(vec![PlainValue::Int(1), PlainValue::Int(2)]);
    let numbers_var =
        Value::container_from_plain(&data, &Type::list(Type::int()))?.assign_to_new_var();
    block.add_var(&numbers_var)?;
    numbers_var.set_name("numbers")?;

    let expected = "const int numbers[] = {
    1,
    2,
};";
    assert_eq!(block.build(&c())?, expected);
    Ok(())
}

#[test]
fn struct_initializers_use_designated_fields() -> Result<()> {
    let block = Block::naming();
    block.set_braces_mode(BracesMode::Never)?;

    let point_ty = Type::struct_of(vec![
        ("x".to_string(), Type::int()),
        ("y".to_string(), Type::int()),
    ]);
    point_ty.set_type_name("Point")?;

    let data = PlainValue::Struct(vec![
        ("x".to_string(), PlainValue::Int(1)),
        ("y".to_string(), PlainValue::Int(2)),
    ]);
    let point_var = Value::container_from_plain(&data, &point_ty)?.assign_to_new_var();
    block.add_var(&point_var)?;
    point_var.set_name("p")?;

    let expected = "const Point p = {
    .x = 1,
    .y = 2,
};";
    assert_eq!(block.build(&c())?, expected);
    Ok(())
}

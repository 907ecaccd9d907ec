//! The registry as seen from a dependent crate, through root re-exports only.

use std::sync::Arc;

use spark_core::{
    Args, BotState, Command, CommandContext, CommandRegistry, DispatchError, RegistryError,
    command_fn,
};

fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register(
            command_fn("echo", |ctx: CommandContext, args: Args| async move {
                ctx.say(args.raw()).await
            })
            .alias("say"),
        )
        .unwrap();
    registry
}

#[test]
fn test_lookup_by_name_and_alias() {
    let registry = registry();
    assert_eq!(registry.lookup("echo").unwrap().name(), "echo");
    assert_eq!(registry.lookup("say").unwrap().name(), "echo");
    assert!(matches!(
        registry.lookup("Echo"),
        Err(DispatchError::CommandNotFound(_))
    ));
}

#[test]
fn test_alias_clash_is_rejected() {
    let mut registry = registry();
    let err = registry
        .register(command_fn("say", |_ctx, _args| async { Ok(()) }))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate { .. }));
}

#[test]
fn test_shared_state_holds_registry() {
    let state = BotState::new("!", Arc::new(registry()));
    assert_eq!(&*state.prefix, "!");
    assert!(state.registry.contains("say"));
}

use slotmap::new_key_type;

new_key_type! {
    /// Identifies one live object inside the simulation engine.
    pub struct NativeHandle;
}
